use serde::Serialize;
use std::path::{Path, PathBuf};

use super::analyze::read_report;
use super::manifest::{ClassNames, DataYaml};
use super::{DatasetError, copy_dir, dir_name_or, require_dir, reset_dir};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SelectSummary {
    /// Brands meeting the threshold, in report order; also the class ids.
    pub selected: Vec<String>,
    pub copied_files: usize,
    /// Selected brands that had no folder under the processed directory.
    pub missing: Vec<String>,
    pub yaml_path: Option<PathBuf>,
}

/// Copies every brand with at least `threshold` images (per the analysis
/// report) into a fresh `output` tree and writes its `data.yaml`.
///
/// Nothing is touched when no brand qualifies.
pub fn select_brands(
    processed: &Path,
    report: &Path,
    output: &Path,
    yaml_path: &Path,
    threshold: usize,
) -> Result<SelectSummary, DatasetError> {
    require_dir(processed)?;

    let selected: Vec<String> = read_report(report)?
        .into_iter()
        .filter(|count| count.images >= threshold)
        .map(|count| count.brand)
        .collect();
    if selected.is_empty() {
        return Ok(SelectSummary::default());
    }

    reset_dir(output)?;

    let mut summary = SelectSummary::default();
    for brand in &selected {
        let source_dir = processed.join(brand);
        if source_dir.is_dir() {
            summary.copied_files += copy_dir(&source_dir, &output.join(brand))?;
        } else {
            log::warn!("Brand folder missing: {}", source_dir.display());
            summary.missing.push(brand.clone());
        }
    }

    let manifest = DataYaml {
        path: Some(format!("../{}", dir_name_or(output, "dataset"))),
        train: "./".to_string(),
        val: "./".to_string(),
        test: None,
        nc: None,
        names: ClassNames::indexed(selected.iter().cloned()),
    };
    manifest.write(yaml_path)?;

    summary.selected = selected;
    summary.yaml_path = Some(yaml_path.to_path_buf());
    Ok(summary)
}
