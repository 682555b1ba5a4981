use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// BLAKE3 digest of the file contents, hex encoded.
/// Used to spot byte-identical images scraped from different pages.
pub fn content_hash(file_path: &Path) -> io::Result<String> {
    let file = File::open(file_path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Hash many files in parallel, keeping input order.
pub fn content_hashes(file_paths: &[PathBuf]) -> Vec<(PathBuf, io::Result<String>)> {
    file_paths
        .par_iter()
        .map(|path| (path.clone(), content_hash(path)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash_format() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("logo.png");
        fs::write(&file_path, b"Hello, World!").unwrap();

        let hash = content_hash(&file_path).unwrap();

        assert_eq!(hash, content_hash(&file_path).unwrap());
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_identical_files_same_hash() {
        let temp_dir = TempDir::new().unwrap();
        let file1 = temp_dir.path().join("nike_1.jpg");
        let file2 = temp_dir.path().join("nike_2.jpg");
        let file3 = temp_dir.path().join("nike_3.jpg");
        fs::write(&file1, b"Identical content").unwrap();
        fs::write(&file2, b"Identical content").unwrap();
        fs::write(&file3, b"Other content").unwrap();

        let results = content_hashes(&[file1.clone(), file2, file3]);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, file1);
        let hashes: Vec<_> = results.iter().map(|(_, h)| h.as_ref().unwrap()).collect();
        assert_eq!(hashes[0], hashes[1]);
        assert_ne!(hashes[0], hashes[2]);
    }

    #[test]
    fn test_missing_file_errors() {
        let temp_dir = TempDir::new().unwrap();
        assert!(content_hash(&temp_dir.path().join("gone.jpg")).is_err());
    }
}
