//! `data.yaml` / `classes.txt` handling for the YOLO training runtime.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DATA_YAML: &str = "data.yaml";
pub const CLASSES_TXT: &str = "classes.txt";
pub const CLASSES_CSV: &str = "_classes.csv";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path} is not a YAML mapping")]
    NotAMapping { path: String },
}

impl ManifestError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn yaml(path: &Path, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Class names either as an index map (`0: nike`) or a plain list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassNames {
    Indexed(BTreeMap<usize, String>),
    List(Vec<String>),
}

impl ClassNames {
    pub fn indexed<I: IntoIterator<Item = String>>(names: I) -> Self {
        Self::Indexed(names.into_iter().enumerate().collect())
    }

    /// Names in class-id order.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::Indexed(map) => map.values().cloned().collect(),
            Self::List(list) => list.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Indexed(map) => map.len(),
            Self::List(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dataset manifest consumed by the training runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataYaml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub train: String,
    pub val: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nc: Option<usize>,
    pub names: ClassNames,
}

impl DataYaml {
    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|e| ManifestError::io(path, e))?;
        serde_yaml::from_str(&content).map_err(|e| ManifestError::yaml(path, e))
    }

    pub fn write(&self, path: &Path) -> Result<(), ManifestError> {
        let content = serde_yaml::to_string(self).map_err(|e| ManifestError::yaml(path, e))?;
        fs::write(path, content).map_err(|e| ManifestError::io(path, e))
    }
}

pub fn read_yaml_value(path: &Path) -> Result<Value, ManifestError> {
    let content = fs::read_to_string(path).map_err(|e| ManifestError::io(path, e))?;
    serde_yaml::from_str(&content).map_err(|e| ManifestError::yaml(path, e))
}

pub fn write_yaml_value(value: &Value, path: &Path) -> Result<(), ManifestError> {
    let content = serde_yaml::to_string(value).map_err(|e| ManifestError::yaml(path, e))?;
    fs::write(path, content).map_err(|e| ManifestError::io(path, e))
}

/// Sets string keys on a YAML mapping file, keeping every other key as is.
pub fn update_yaml_keys(path: &Path, updates: &[(&str, String)]) -> Result<(), ManifestError> {
    let mut value = read_yaml_value(path)?;
    let Value::Mapping(mapping) = &mut value else {
        return Err(ManifestError::NotAMapping {
            path: path.display().to_string(),
        });
    };
    for (key, new_value) in updates {
        mapping.insert(Value::from(*key), Value::from(new_value.as_str()));
    }
    write_yaml_value(&value, path)
}

/// Deep merge: nested mappings merge, sequences concatenate, anything else
/// from `overlay` replaces `base`.
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => Value::Mapping(merge_mappings(base, overlay)),
        (Value::Sequence(mut base), Value::Sequence(overlay)) => {
            base.extend(overlay);
            Value::Sequence(base)
        }
        (_, overlay) => overlay,
    }
}

fn merge_mappings(mut base: Mapping, overlay: Mapping) -> Mapping {
    for (key, value) in overlay {
        match base.get_mut(&key) {
            Some(existing) => {
                let current = std::mem::take(existing);
                *existing = merge_values(current, value);
            }
            None => {
                base.insert(key, value);
            }
        }
    }
    base
}

pub fn merge_yaml_files(first: &Path, second: &Path, output: &Path) -> Result<(), ManifestError> {
    let merged = merge_values(read_yaml_value(first)?, read_yaml_value(second)?);
    write_yaml_value(&merged, output)
}

/// Class names from the header of a Roboflow `_classes.csv`
/// (`filename, nike, adidas, ...`).
pub fn classes_from_csv(path: &Path) -> Result<Vec<String>, ManifestError> {
    let csv_error = |source| ManifestError::Csv {
        path: path.display().to_string(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?;

    let mut names: Vec<String> = headers
        .iter()
        .map(str::to_string)
        .filter(|name| !name.is_empty())
        .collect();
    if names.first().is_some_and(|first| first == "filename") {
        names.remove(0);
    }
    Ok(names)
}

pub fn write_classes_txt(names: &[String], path: &Path) -> Result<(), ManifestError> {
    let mut content = names.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    fs::write(path, content).map_err(|e| ManifestError::io(path, e))
}

/// Class names of a dataset: its `data.yaml` when present, otherwise the
/// header of `train/_classes.csv`.
pub fn dataset_class_names(dataset: &Path) -> Result<Vec<String>, ManifestError> {
    let yaml_path = dataset.join(DATA_YAML);
    if yaml_path.is_file() {
        return Ok(DataYaml::read(&yaml_path)?.names.to_vec());
    }
    classes_from_csv(&dataset.join("train").join(CLASSES_CSV))
}

/// Writes `classes.txt` and a split-layout `data.yaml` next to `train/`,
/// taking class names from `train/_classes.csv`.
pub fn generate_from_classes_csv(dataset: &Path) -> Result<DataYaml, ManifestError> {
    let names = classes_from_csv(&dataset.join("train").join(CLASSES_CSV))?;
    write_classes_txt(&names, &dataset.join(CLASSES_TXT))?;

    let manifest = DataYaml {
        path: None,
        train: "train/images".to_string(),
        val: "valid/images".to_string(),
        test: Some("test/images".to_string()),
        nc: Some(names.len()),
        names: ClassNames::List(names),
    };
    manifest.write(&dataset.join(DATA_YAML))?;
    Ok(manifest)
}
