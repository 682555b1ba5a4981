//! Dataset preparation: organizing scraped logo images into per-brand folders
//! and turning those folders into YOLO training layouts.

pub mod analyze;
pub mod hash;
pub mod inspect;
pub mod manifest;
pub mod merge_csv;
pub mod organize;
pub mod reduce;
pub mod reindex;
pub mod scanner;
pub mod select;
pub mod split;

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Split folder names used by Roboflow-style YOLO exports.
pub const YOLO_SPLITS: [&str; 3] = ["train", "valid", "test"];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    #[error("Directory not found: {path}")]
    MissingDirectory { path: String },

    #[error("No images found in {path}")]
    NoImages { path: String },

    #[error("Split ratios must sum to 1.0 (train {train}, val {val}, test {test})")]
    InvalidRatios { train: f64, val: f64, test: f64 },

    #[error("Malformed report line {line}: {content:?}")]
    MalformedReport { line: usize, content: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] manifest::ManifestError),

    #[error("Summary serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub(crate) fn require_dir(path: &Path) -> Result<(), DatasetError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(DatasetError::MissingDirectory {
            path: path.display().to_string(),
        })
    }
}

/// Fails when either path contains the other, so clearing `output` can never
/// touch `source`.
pub(crate) fn require_disjoint(source: &Path, output: &Path) -> Result<(), DatasetError> {
    let source_abs = absolute(source);
    let output_abs = absolute(output);
    if output_abs.starts_with(&source_abs) || source_abs.starts_with(&output_abs) {
        return Err(DatasetError::InvalidPath {
            path: format!(
                "output {} overlaps source {}",
                output.display(),
                source.display()
            ),
        });
    }
    Ok(())
}

/// Removes `path` if present and recreates it empty.
pub fn reset_dir(path: &Path) -> Result<(), DatasetError> {
    if path.exists() {
        log::info!("Clearing existing directory {}", path.display());
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)?;
    Ok(())
}

/// Recursively copies `src` into `dst`, returning the number of files copied.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<usize, DatasetError> {
    require_dir(src)?;
    let mut copied = 0;

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| DatasetError::InvalidPath {
                path: entry.path().display().to_string(),
            })?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Lossy file stem, empty when the path has none.
pub(crate) fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Directory name of `path`, falling back to `fallback` for roots like `..`.
pub(crate) fn dir_name_or(path: &Path, fallback: &str) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| fallback.to_string())
}

pub(crate) fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reset_dir_clears_contents() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("out");
        fs::create_dir_all(target.join("nested")).unwrap();
        fs::write(target.join("nested").join("a.txt"), b"a").unwrap();

        reset_dir(&target).unwrap();

        assert!(target.is_dir());
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn test_copy_dir_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        fs::create_dir_all(src.join("labels")).unwrap();
        fs::write(src.join("a.jpg"), b"img").unwrap();
        fs::write(src.join("labels").join("a.txt"), b"0 0.5 0.5 1 1").unwrap();

        let dst = temp_dir.path().join("dst");
        let copied = copy_dir(&src, &dst).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read(dst.join("labels").join("a.txt")).unwrap(), b"0 0.5 0.5 1 1");
    }

    #[test]
    fn test_overlapping_paths_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let data = temp_dir.path().join("data");

        for output in [data.clone(), data.join("copy"), temp_dir.path().to_path_buf()] {
            assert!(matches!(
                require_disjoint(&data, &output),
                Err(DatasetError::InvalidPath { .. })
            ));
        }
        assert!(require_disjoint(&data, &temp_dir.path().join("data_copy")).is_ok());
    }

    #[test]
    fn test_copy_dir_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let result = copy_dir(&temp_dir.path().join("nope"), &temp_dir.path().join("dst"));
        assert!(matches!(result, Err(DatasetError::MissingDirectory { .. })));
    }
}
