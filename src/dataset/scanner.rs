use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{DatasetError, require_dir};

/// Whether `path` carries one of `extensions` (lowercase, no dot).
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.iter().any(|allowed| *allowed == ext))
}

/// Recursively walk `root`, returning image paths sorted by file name.
pub fn scan_images(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, DatasetError> {
    walk(root, extensions, None)
}

/// Images directly inside `dir`, without descending.
pub fn list_images(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, DatasetError> {
    walk(dir, extensions, Some(1))
}

/// Every regular file directly inside `dir`.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    require_dir(dir)?;
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Sub-directories directly inside `dir`, sorted by name.
pub fn list_subdirs(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    require_dir(dir)?;
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

fn walk(
    root: &Path,
    extensions: &[String],
    max_depth: Option<usize>,
) -> Result<Vec<PathBuf>, DatasetError> {
    require_dir(root)?;

    let mut walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    let mut images = Vec::new();
    for entry in walker.into_iter().filter_map(|e| match e {
        Ok(entry) => Some(entry),
        Err(err) => {
            log::warn!("Skipping unreadable entry under {}: {}", root.display(), err);
            None
        }
    }) {
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            images.push(entry.into_path());
        }
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn exts() -> Vec<String> {
        vec!["jpg".to_string(), "png".to_string()]
    }

    #[test]
    fn test_extension_filter_is_case_insensitive() {
        assert!(has_extension(Path::new("a/Logo.PNG"), &exts()));
        assert!(has_extension(Path::new("b.jpg"), &exts()));
        assert!(!has_extension(Path::new("c.txt"), &exts()));
        assert!(!has_extension(Path::new("no_extension"), &exts()));
    }

    #[test]
    fn test_scan_recurses_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("nike")).unwrap();
        fs::write(root.join("nike").join("b.jpg"), b"x").unwrap();
        fs::write(root.join("nike").join("a.PNG"), b"x").unwrap();
        fs::write(root.join("nike").join("a.txt"), b"x").unwrap();
        fs::write(root.join("top.png"), b"x").unwrap();

        let found = scan_images(root, &exts()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names.len(), 3);
        assert!(names.contains(&"top.png".to_string()));
        let a = names.iter().position(|n| n.ends_with("a.PNG")).unwrap();
        let b = names.iter().position(|n| n.ends_with("b.jpg")).unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_list_images_does_not_descend() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub").join("deep.jpg"), b"x").unwrap();
        fs::write(root.join("shallow.jpg"), b"x").unwrap();

        let found = list_images(root, &exts()).unwrap();
        assert_eq!(found, vec![root.join("shallow.jpg")]);
    }

    #[test]
    fn test_list_subdirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("puma")).unwrap();
        fs::create_dir_all(root.join("adidas")).unwrap();
        fs::write(root.join("notes.json"), b"{}").unwrap();

        let dirs = list_subdirs(root).unwrap();
        assert_eq!(dirs, vec![root.join("adidas"), root.join("puma")]);
    }

    #[test]
    fn test_scan_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let result = scan_images(&temp_dir.path().join("missing"), &exts());
        assert!(matches!(result, Err(DatasetError::MissingDirectory { .. })));
    }
}
