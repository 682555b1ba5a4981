use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use super::scanner::{has_extension, list_files};
use super::{DatasetError, YOLO_SPLITS, require_dir, stem_of};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassStats {
    pub name: String,
    /// Images with at least one instance of this class.
    pub images: usize,
    pub instances: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitStats {
    pub split: String,
    pub files: usize,
    pub images: usize,
    pub label_files: usize,
    pub images_without_labels: usize,
    pub classes: Vec<ClassStats>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InspectReport {
    pub dataset: PathBuf,
    pub splits: Vec<SplitStats>,
}

impl InspectReport {
    pub fn total_images(&self) -> usize {
        self.splits.iter().map(|split| split.images).sum()
    }

    pub fn total_instances(&self) -> usize {
        self.splits
            .iter()
            .flat_map(|split| &split.classes)
            .map(|class| class.instances)
            .sum()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Dataset: {}", self.dataset.display());
        for split in &self.splits {
            let _ = writeln!(out, "\n[{}]", split.split);
            let _ = writeln!(
                out,
                "  files: {}  images: {}  labels: {}  unlabeled: {}",
                split.files, split.images, split.label_files, split.images_without_labels
            );
            for class in split.classes.iter().filter(|class| class.instances > 0) {
                let _ = writeln!(
                    out,
                    "  {:<30} {:>6} images {:>8} instances",
                    class.name, class.images, class.instances
                );
            }
        }
        let _ = writeln!(
            out,
            "\nTotal: {} images, {} instances",
            self.total_images(),
            self.total_instances()
        );
        out
    }
}

/// Per-split statistics of a YOLO dataset. A split is either
/// `<split>/images` + `<split>/labels` or a single folder holding both.
pub fn inspect_dataset(
    dataset: &Path,
    class_names: &[String],
    image_extensions: &[String],
    label_extension: &str,
) -> Result<InspectReport, DatasetError> {
    require_dir(dataset)?;

    let mut report = InspectReport {
        dataset: dataset.to_path_buf(),
        splits: Vec::new(),
    };

    for split in YOLO_SPLITS {
        let split_dir = dataset.join(split);
        if !split_dir.is_dir() {
            continue;
        }
        let (images_dir, labels_dir) = if split_dir.join("images").is_dir() {
            (split_dir.join("images"), split_dir.join("labels"))
        } else {
            (split_dir.clone(), split_dir.clone())
        };
        report.splits.push(inspect_split(
            split,
            &images_dir,
            &labels_dir,
            class_names,
            image_extensions,
            label_extension,
        )?);
    }

    Ok(report)
}

fn inspect_split(
    split: &str,
    images_dir: &Path,
    labels_dir: &Path,
    class_names: &[String],
    image_extensions: &[String],
    label_extension: &str,
) -> Result<SplitStats, DatasetError> {
    let mut stats = SplitStats {
        split: split.to_string(),
        classes: class_names
            .iter()
            .map(|name| ClassStats {
                name: name.clone(),
                ..ClassStats::default()
            })
            .collect(),
        ..SplitStats::default()
    };

    let files = list_files(images_dir)?;
    stats.files = files.len();
    let images: Vec<&PathBuf> = files
        .iter()
        .filter(|file| has_extension(file, image_extensions))
        .collect();
    stats.images = images.len();

    for image in images {
        let label = labels_dir.join(format!("{}.{label_extension}", stem_of(image)));
        let Ok(content) = fs::read_to_string(&label) else {
            stats.images_without_labels += 1;
            continue;
        };
        stats.label_files += 1;

        let mut seen = HashSet::new();
        for class_id in content.lines().filter_map(class_id_of) {
            let Some(class) = stats.classes.get_mut(class_id) else {
                log::debug!("Class id {class_id} out of range in {}", label.display());
                continue;
            };
            class.instances += 1;
            if seen.insert(class_id) {
                class.images += 1;
            }
        }
    }

    Ok(stats)
}

/// Class id of a label line, `None` for blank or malformed lines.
fn class_id_of(line: &str) -> Option<usize> {
    line.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names() -> Vec<String> {
        vec!["nike".to_string(), "adidas".to_string()]
    }

    fn exts() -> Vec<String> {
        vec!["jpg".to_string(), "png".to_string()]
    }

    #[test]
    fn test_class_id_parsing() {
        assert_eq!(class_id_of("1 0.5 0.5 0.2 0.2"), Some(1));
        assert_eq!(class_id_of("   "), None);
        assert_eq!(class_id_of("x 0.5 0.5"), None);
        assert_eq!(class_id_of("-1 0.5"), None);
    }

    #[test]
    fn test_inspect_split_with_subfolders() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let images = root.join("train").join("images");
        let labels = root.join("train").join("labels");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();
        fs::write(images.join("a.jpg"), b"x").unwrap();
        fs::write(images.join("b.png"), b"x").unwrap();
        fs::write(images.join("c.jpg"), b"x").unwrap();
        fs::write(images.join("notes.md"), b"x").unwrap();
        fs::write(labels.join("a.txt"), "0 0.5 0.5 1 1\n0 0.1 0.1 0.2 0.2\n1 0.3 0.3 0.1 0.1\n").unwrap();
        fs::write(labels.join("b.txt"), "1 0.5 0.5 1 1\nbroken\n7 0.5 0.5 1 1\n").unwrap();

        let report = inspect_dataset(root, &names(), &exts(), "txt").unwrap();

        assert_eq!(report.splits.len(), 1);
        let train = &report.splits[0];
        assert_eq!((train.files, train.images, train.label_files), (4, 3, 2));
        assert_eq!(train.images_without_labels, 1);
        assert_eq!(
            train.classes,
            vec![
                ClassStats { name: "nike".to_string(), images: 1, instances: 2 },
                ClassStats { name: "adidas".to_string(), images: 2, instances: 2 },
            ]
        );
        assert_eq!(report.total_instances(), 4);
    }

    #[test]
    fn test_inspect_flat_split() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let valid = root.join("valid");
        fs::create_dir_all(&valid).unwrap();
        fs::write(valid.join("a.jpg"), b"x").unwrap();
        fs::write(valid.join("a.txt"), "1 0.5 0.5 1 1\n").unwrap();

        let report = inspect_dataset(root, &names(), &exts(), "txt").unwrap();

        let split = &report.splits[0];
        assert_eq!(split.split, "valid");
        assert_eq!((split.files, split.images, split.label_files), (2, 1, 1));
        assert_eq!(report.total_images(), 1);
        assert!(report.render().contains("adidas"));
    }

    #[test]
    fn test_inspect_custom_label_extension() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let test = root.join("test");
        fs::create_dir_all(&test).unwrap();
        fs::write(test.join("a.jpg"), b"x").unwrap();
        fs::write(test.join("a.txt"), "9 stale\n").unwrap();
        fs::write(test.join("a.yolo"), "0 0.5 0.5 1 1\n").unwrap();

        let report = inspect_dataset(root, &names(), &exts(), "yolo").unwrap();

        assert_eq!(report.splits[0].label_files, 1);
        assert_eq!(report.splits[0].classes[0].instances, 1);
    }
}
