use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::fs;
use std::path::Path;

use super::manifest::DATA_YAML;
use super::scanner::list_images;
use super::{DatasetError, YOLO_SPLITS, stem_of};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitReduction {
    pub split: String,
    pub original: usize,
    pub selected: usize,
    pub copied: usize,
    pub missing_labels: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReduceSummary {
    pub factor: f64,
    pub splits: Vec<SplitReduction>,
    pub yaml_copied: bool,
}

/// Shrinks a split dataset so that `train` holds about `target_train_size`
/// images, sampling `valid` and `test` by the same factor.
pub fn reduce_dataset(
    source: &Path,
    dest: &Path,
    target_train_size: usize,
    seed: u64,
    extensions: &[String],
    label_extension: &str,
) -> Result<ReduceSummary, DatasetError> {
    let train_images = source.join("train").join("images");
    let original_train = list_images(&train_images, extensions)?.len();
    if original_train == 0 {
        return Err(DatasetError::NoImages {
            path: train_images.display().to_string(),
        });
    }

    let factor = target_train_size as f64 / original_train as f64;
    log::info!("Reduction factor {factor:.4} ({original_train} training images)");

    let mut rng = StdRng::seed_from_u64(seed);
    let mut splits = Vec::new();

    for split in YOLO_SPLITS {
        let images_dir = source.join(split).join("images");
        let labels_dir = source.join(split).join("labels");
        if !images_dir.is_dir() {
            log::info!("Skipping '{split}' split, folder not found");
            continue;
        }

        let dest_images = dest.join(split).join("images");
        let dest_labels = dest.join(split).join("labels");
        fs::create_dir_all(&dest_images)?;
        fs::create_dir_all(&dest_labels)?;

        let images = list_images(&images_dir, extensions)?;
        let keep = ((images.len() as f64 * factor) as usize).min(images.len());
        let mut selected: Vec<_> = images.choose_multiple(&mut rng, keep).collect();
        selected.sort();

        let mut reduction = SplitReduction {
            split: split.to_string(),
            original: images.len(),
            selected: keep,
            copied: 0,
            missing_labels: 0,
        };

        for image in selected {
            let label = labels_dir.join(format!("{}.{label_extension}", stem_of(image)));
            if !label.is_file() {
                log::warn!("Label file not found for {}, skipping", image.display());
                reduction.missing_labels += 1;
                continue;
            }
            let (Some(image_name), Some(label_name)) = (image.file_name(), label.file_name())
            else {
                continue;
            };
            fs::copy(image, dest_images.join(image_name))?;
            fs::copy(&label, dest_labels.join(label_name))?;
            reduction.copied += 1;
        }

        splits.push(reduction);
    }

    let source_yaml = source.join(DATA_YAML);
    let yaml_copied = source_yaml.is_file();
    if yaml_copied {
        fs::copy(&source_yaml, dest.join(DATA_YAML))?;
    } else {
        log::warn!("No {} in {}", DATA_YAML, source.display());
    }

    Ok(ReduceSummary {
        factor,
        splits,
        yaml_copied,
    })
}
