use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::manifest::ManifestError;
use super::scanner::{has_extension, list_files};
use super::{DatasetError, YOLO_SPLITS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvMerge {
    pub split: String,
    pub inputs: Vec<PathBuf>,
    /// Union of every input header, in order of first appearance.
    pub columns: Vec<String>,
    pub rows: usize,
    pub path: PathBuf,
}

/// For each split, concatenates the `*.csv` annotation files found under
/// `<base>/<split>/` of every base folder into `<output_dir>/merged_<split>.csv`.
/// Splits without any CSV file are skipped.
pub fn merge_split_csvs(
    base_folders: &[PathBuf],
    output_dir: &Path,
) -> Result<Vec<CsvMerge>, DatasetError> {
    let csv_extension = ["csv".to_string()];
    fs::create_dir_all(output_dir)?;
    let mut merges = Vec::new();

    for split in YOLO_SPLITS {
        let mut inputs = Vec::new();
        for base in base_folders {
            let split_dir = base.join(split);
            if !split_dir.is_dir() {
                continue;
            }
            inputs.extend(
                list_files(&split_dir)?
                    .into_iter()
                    .filter(|file| has_extension(file, &csv_extension)),
            );
        }
        if inputs.is_empty() {
            log::info!("No CSV files found in '{split}' folders");
            continue;
        }

        let path = output_dir.join(format!("merged_{split}.csv"));
        let (columns, rows) = merge_csv_files(&inputs, &path)?;
        merges.push(CsvMerge {
            split: split.to_string(),
            inputs,
            columns,
            rows,
            path,
        });
    }

    Ok(merges)
}

/// Writes the rows of every input under one header. Columns missing from an
/// input are left empty. Returns the header and the number of rows written.
pub fn merge_csv_files(
    inputs: &[PathBuf],
    output: &Path,
) -> Result<(Vec<String>, usize), ManifestError> {
    let mut tables = Vec::with_capacity(inputs.len());
    let mut columns: Vec<String> = Vec::new();

    for input in inputs {
        let csv_error = |source| ManifestError::Csv {
            path: input.display().to_string(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(input)
            .map_err(csv_error)?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect();
        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_error)?;

        for header in &headers {
            if !columns.contains(header) {
                columns.push(header.clone());
            }
        }
        tables.push((headers, records));
    }

    let csv_error = |source| ManifestError::Csv {
        path: output.display().to_string(),
        source,
    };
    let mut writer = csv::Writer::from_path(output).map_err(csv_error)?;
    writer.write_record(&columns).map_err(csv_error)?;

    let mut rows = 0;
    for (headers, records) in &tables {
        let positions: Vec<Option<usize>> = columns
            .iter()
            .map(|column| headers.iter().position(|header| header == column))
            .collect();
        for record in records {
            let row = positions
                .iter()
                .map(|position| position.and_then(|i| record.get(i)).unwrap_or(""));
            writer.write_record(row).map_err(csv_error)?;
            rows += 1;
        }
    }
    writer
        .flush()
        .map_err(|source| ManifestError::Io {
            path: output.display().to_string(),
            source,
        })?;

    Ok((columns, rows))
}
