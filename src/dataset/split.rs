use indicatif::ProgressBar;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::manifest::{ClassNames, DataYaml};
use super::scanner::{list_images, list_subdirs};
use super::{DatasetError, absolute, dir_name_or, require_dir, reset_dir};

const RATIO_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatios {
    pub train: f64,
    pub val: f64,
    pub test: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.8,
            val: 0.1,
            test: 0.1,
        }
    }
}

impl SplitRatios {
    pub fn validate(&self) -> Result<(), DatasetError> {
        let in_range = [self.train, self.val, self.test]
            .iter()
            .all(|ratio| (0.0..=1.0).contains(ratio));
        if !in_range || (self.train + self.val + self.test - 1.0).abs() > RATIO_TOLERANCE {
            return Err(DatasetError::InvalidRatios {
                train: self.train,
                val: self.val,
                test: self.test,
            });
        }
        Ok(())
    }

    /// Train and val sizes are floored; test takes the remainder.
    pub fn partition(&self, total: usize) -> (usize, usize, usize) {
        let train = (total as f64 * self.train) as usize;
        let val = ((total as f64 * self.val) as usize).min(total - train);
        (train, val, total - train - val)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SplitSummary {
    pub classes: Vec<String>,
    pub train: usize,
    pub val: usize,
    pub test: usize,
    /// Images left out because they had no label file.
    pub unlabeled: usize,
    pub yaml_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub ratios: SplitRatios,
    pub seed: u64,
    pub image_extensions: Vec<String>,
    pub label_extension: String,
}

/// Splits a brand-folder tree into `train/`, `val/` and `test/`, each with
/// `images/<brand>/` and `labels/<brand>/`, and writes `<output>/<name>.yaml`.
pub fn split_dataset(
    source: &Path,
    output: &Path,
    options: &SplitOptions,
    progress: &ProgressBar,
) -> Result<SplitSummary, DatasetError> {
    require_dir(source)?;
    options.ratios.validate()?;

    let split_dirs = ["train", "val", "test"].map(|name| output.join(name));
    for dir in &split_dirs {
        reset_dir(dir)?;
        fs::create_dir_all(dir.join("images"))?;
        fs::create_dir_all(dir.join("labels"))?;
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut summary = SplitSummary::default();
    let brand_dirs = list_subdirs(source)?;
    progress.set_length(brand_dirs.len() as u64);

    for brand_dir in brand_dirs {
        let class_name = dir_name_or(&brand_dir, "");
        let images = list_images(&brand_dir, &options.image_extensions)?;
        let total_images = images.len();

        let mut pairs: Vec<(PathBuf, PathBuf)> = images
            .into_iter()
            .filter_map(|image| {
                let label = image.with_extension(&options.label_extension);
                label.is_file().then_some((image, label))
            })
            .collect();
        summary.unlabeled += total_images - pairs.len();
        pairs.shuffle(&mut rng);

        let (train, val, _) = options.ratios.partition(pairs.len());
        let (train_pairs, rest) = pairs.split_at(train);
        let (val_pairs, test_pairs) = rest.split_at(val);

        for (chunk, split_dir) in [train_pairs, val_pairs, test_pairs].iter().zip(&split_dirs) {
            if chunk.is_empty() {
                continue;
            }
            let images_dir = split_dir.join("images").join(&class_name);
            let labels_dir = split_dir.join("labels").join(&class_name);
            fs::create_dir_all(&images_dir)?;
            fs::create_dir_all(&labels_dir)?;

            for (image, label) in chunk.iter() {
                copy_into(image, &images_dir)?;
                copy_into(label, &labels_dir)?;
            }
        }

        summary.train += train_pairs.len();
        summary.val += val_pairs.len();
        summary.test += test_pairs.len();
        summary.classes.push(class_name);
        progress.inc(1);
    }

    summary.classes.sort();
    let yaml_path = output.join(format!("{}.yaml", dir_name_or(output, "dataset")));
    let manifest = DataYaml {
        path: Some(absolute(output).display().to_string()),
        train: "train/images".to_string(),
        val: "val/images".to_string(),
        test: Some("test/images".to_string()),
        nc: None,
        names: ClassNames::indexed(summary.classes.iter().cloned()),
    };
    manifest.write(&yaml_path)?;
    summary.yaml_path = yaml_path;

    Ok(summary)
}

fn copy_into(file: &Path, dir: &Path) -> Result<(), DatasetError> {
    if let Some(name) = file.file_name() {
        fs::copy(file, dir.join(name))?;
    }
    Ok(())
}
