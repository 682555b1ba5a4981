use indicatif::ProgressBar;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use logoset::Canonicalizer;
use logoset::dataset::analyze::{count_brand_images, read_report, write_report};
use logoset::dataset::manifest::DataYaml;
use logoset::dataset::organize::{OrganizeOptions, Organizer, SUMMARY_FILE_NAME};
use logoset::dataset::select::select_brands;
use logoset::dataset::split::{SplitOptions, SplitRatios, split_dataset};

fn write_pair(source: &Path, stem: &str, class_id: usize) {
    let images = source.join("images");
    let labels = source.join("labels");
    fs::create_dir_all(&images).unwrap();
    fs::create_dir_all(&labels).unwrap();
    fs::write(images.join(format!("{stem}.jpg")), stem.as_bytes()).unwrap();
    fs::write(
        labels.join(format!("{stem}.txt")),
        format!("{class_id} 0.5 0.5 0.4 0.4\n"),
    )
    .unwrap();
}

fn extensions() -> Vec<String> {
    vec!["jpg".to_string(), "png".to_string()]
}

#[test]
fn test_organize_analyze_select_split() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let source = root.join("dataset_yolo");
    for i in 0..5 {
        write_pair(&source, &format!("Nike_Jordan_Logo_{i}"), 0);
    }
    for i in 0..4 {
        write_pair(&source, &format!("mercedes-benz-vector-black_{i}"), 1);
    }
    write_pair(&source, "adidas_logo_1", 2);
    write_pair(&source, "adidas_logo_2", 2);
    write_pair(&source, "a1b2c3d4e5f6", 3);

    // organize
    let processed = root.join("processed_final");
    let canonicalizer = Canonicalizer::default();
    let organizer = Organizer::new(&canonicalizer, OrganizeOptions::default());
    let summary = organizer
        .run(&source, &processed, &ProgressBar::hidden())
        .unwrap();

    assert_eq!(summary.total_images, 12);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.processed, 11);
    assert_eq!(summary.labels_copied, 11);
    assert_eq!(summary.brands.get("nike"), Some(&5));
    assert_eq!(summary.brands.get("mercedes-benz"), Some(&4));
    assert!(processed.join(SUMMARY_FILE_NAME).is_file());

    // analyze
    let counts = count_brand_images(&processed, &extensions()).unwrap();
    let report = root.join("analysis_report.txt");
    write_report(&counts, &report).unwrap();
    let parsed = read_report(&report).unwrap();
    assert_eq!(parsed, counts);
    assert_eq!(parsed[0].brand, "nike");

    // select
    let selected_dir = root.join("dataset_for_training");
    let yaml_path = root.join("dataset_for_training.yaml");
    let selection = select_brands(&processed, &report, &selected_dir, &yaml_path, 3).unwrap();
    assert_eq!(selection.selected, vec!["nike", "mercedes-benz"]);
    assert!(selection.missing.is_empty());
    assert_eq!(selection.copied_files, 18);
    assert!(!selected_dir.join("adidas").exists());

    // split
    let training = root.join("yolo_training_data");
    let options = SplitOptions {
        ratios: SplitRatios::default(),
        seed: 42,
        image_extensions: extensions(),
        label_extension: "txt".to_string(),
    };
    let split = split_dataset(&selected_dir, &training, &options, &ProgressBar::hidden()).unwrap();

    assert_eq!(split.classes, vec!["mercedes-benz", "nike"]);
    assert_eq!((split.train, split.val, split.test), (7, 0, 2));
    assert_eq!(split.unlabeled, 0);

    let manifest = DataYaml::read(&training.join("yolo_training_data.yaml")).unwrap();
    assert_eq!(manifest.train, "train/images");
    assert_eq!(manifest.names.to_vec(), vec!["mercedes-benz", "nike"]);
    assert_eq!(
        fs::read_dir(training.join("train").join("labels").join("nike"))
            .unwrap()
            .count(),
        4
    );
}

#[test]
fn test_dry_run_reports_without_copying() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let source = root.join("scraped");
    write_pair(&source, "Ferrari_logo_2010", 0);
    write_pair(&source, "unknown_startup_2019", 1);

    let output = root.join("out");
    let canonicalizer = Canonicalizer::default();
    let organizer = Organizer::new(
        &canonicalizer,
        OrganizeOptions {
            dry_run: true,
            ..OrganizeOptions::default()
        },
    );
    let summary = organizer
        .run(&source, &output, &ProgressBar::hidden())
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.fallback_labels, 1);
    assert!(summary.brands.contains_key("unknown-startup"));
    assert!(!output.exists());
}

#[test]
fn test_free_functions_match_default_canonicalizer() {
    let canonicalizer = Canonicalizer::default();
    for name in ["nike_jordan_logo_2021", "mercedes-benz-vector-black", "0001", "ab"] {
        assert_eq!(logoset::canonicalize(name), canonicalizer.canonicalize(name));
    }
    assert_eq!(
        logoset::canonicalize_with_dir(Some("BMW"), "IMG_0042"),
        Some("bmw".to_string())
    );
}
