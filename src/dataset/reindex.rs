use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::manifest::{DATA_YAML, update_yaml_keys};
use super::scanner::list_images;
use super::{
    DatasetError, YOLO_SPLITS, absolute, copy_dir, require_dir, require_disjoint, reset_dir,
    stem_of,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReindexSummary {
    pub images: usize,
    pub labels: usize,
    pub yaml_updated: bool,
}

/// Renames `*.jpg` images of every split to `<prefix>_<index:06>.jpg`, in
/// file-name order, and their `<stem>.<label_extension>` labels to match.
/// `data.yaml` is pointed at the absolute split folders afterwards.
pub fn reindex_dataset(
    dataset: &Path,
    prefix: &str,
    label_extension: &str,
) -> Result<ReindexSummary, DatasetError> {
    let mut summary = ReindexSummary::default();
    let extensions = ["jpg".to_string()];

    for split in YOLO_SPLITS {
        let images_dir = dataset.join(split).join("images");
        let labels_dir = dataset.join(split).join("labels");
        if !images_dir.is_dir() || !labels_dir.is_dir() {
            continue;
        }

        let images = list_images(&images_dir, &extensions)?;
        let mut staged: Vec<(PathBuf, Option<PathBuf>, String)> = Vec::with_capacity(images.len());

        // two passes so new names never collide with files not yet renamed
        for (index, image) in images.iter().enumerate() {
            let temp_image = images_dir.join(format!(".reindex-{index}.tmp"));
            fs::rename(image, &temp_image)?;

            let label = labels_dir.join(format!("{}.{label_extension}", stem_of(image)));
            let temp_label = if label.is_file() {
                let temp = labels_dir.join(format!(".reindex-{index}.tmp"));
                fs::rename(&label, &temp)?;
                Some(temp)
            } else {
                None
            };

            staged.push((temp_image, temp_label, format!("{prefix}_{index:06}")));
        }

        for (temp_image, temp_label, new_name) in staged {
            fs::rename(&temp_image, images_dir.join(format!("{new_name}.jpg")))?;
            summary.images += 1;
            if let Some(temp_label) = temp_label {
                fs::rename(
                    &temp_label,
                    labels_dir.join(format!("{new_name}.{label_extension}")),
                )?;
                summary.labels += 1;
            }
        }
    }

    let yaml_path = dataset.join(DATA_YAML);
    if yaml_path.is_file() {
        point_manifest_at(&yaml_path, dataset)?;
        summary.yaml_updated = true;
    }

    Ok(summary)
}

/// Replaces `dest` with a full copy of `source`, returning the number of
/// files copied. Refuses paths that contain one another.
pub fn copy_dataset(source: &Path, dest: &Path) -> Result<usize, DatasetError> {
    require_dir(source)?;
    require_disjoint(source, dest)?;
    reset_dir(dest)?;
    copy_dir(source, dest)
}

/// Rewrites `train`/`val`/`test` of a manifest to absolute split paths.
pub fn point_manifest_at(yaml_path: &Path, dataset: &Path) -> Result<(), DatasetError> {
    let root = absolute(dataset);
    let split_path = |split: &str| root.join(split).join("images").display().to_string();
    update_yaml_keys(
        yaml_path,
        &[
            ("train", split_path("train")),
            ("val", split_path("valid")),
            ("test", split_path("test")),
        ],
    )?;
    Ok(())
}
