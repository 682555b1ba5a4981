use serde::Serialize;
use std::fs;
use std::path::Path;

use super::DatasetError;
use super::scanner::{list_images, list_subdirs};

const RULE: &str = "-------------------------------------";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandCount {
    pub brand: String,
    pub images: usize,
}

/// Images per brand folder, most populated first (ties by name).
pub fn count_brand_images(
    dir: &Path,
    extensions: &[String],
) -> Result<Vec<BrandCount>, DatasetError> {
    let mut counts = Vec::new();
    for brand_dir in list_subdirs(dir)? {
        let images = list_images(&brand_dir, extensions)?.len();
        counts.push(BrandCount {
            brand: super::dir_name_or(&brand_dir, ""),
            images,
        });
    }
    counts.sort_by(|a, b| b.images.cmp(&a.images).then_with(|| a.brand.cmp(&b.brand)));
    Ok(counts)
}

pub fn render_report(counts: &[BrandCount]) -> String {
    let mut report = String::from("--- Dataset Analysis Report ---\n\n");
    report.push_str(&format!("Total unique brands found: {}\n", counts.len()));
    report.push_str(RULE);
    report.push('\n');
    report.push_str(&format!("{:<40} | {:<10}\n", "Brand Name", "Image Count"));
    report.push_str(RULE);
    report.push('\n');
    for count in counts {
        report.push_str(&format!("{:<40} | {:<10}\n", count.brand, count.images));
    }
    report
}

pub fn write_report(counts: &[BrandCount], path: &Path) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_report(counts))?;
    Ok(())
}

/// Reads back a report written by [`render_report`].
pub fn parse_report(content: &str) -> Result<Vec<BrandCount>, DatasetError> {
    let mut counts = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if !line.contains('|') || line.starts_with("---") || line.starts_with("Brand Name") {
            continue;
        }

        let malformed = || DatasetError::MalformedReport {
            line: index + 1,
            content: line.to_string(),
        };
        let (brand, images) = line.split_once('|').ok_or_else(malformed)?;
        let images = images.trim().parse::<usize>().map_err(|_| malformed())?;
        let brand = brand.trim();
        if brand.is_empty() {
            return Err(malformed());
        }

        counts.push(BrandCount {
            brand: brand.to_string(),
            images,
        });
    }
    Ok(counts)
}

pub fn read_report(path: &Path) -> Result<Vec<BrandCount>, DatasetError> {
    let content = fs::read_to_string(path)?;
    parse_report(&content)
}
