//! Tables translating raw modification keys (the text inside `[...]` in an
//! annotated peptide) into display labels.

use crate::errors::ModificationConfigError;
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// A modification entry in the unimod style configuration file:
/// `{"modifications": [{"name": "Oxidation", "unimod_accession": 35}]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnimodEntry {
    pub name: String,
    pub unimod_accession: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UnimodConfig {
    modifications: Vec<UnimodEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ModificationFile {
    Unimod(UnimodConfig),
    Plain(HashMap<String, String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModificationMapping {
    labels: HashMap<String, String>,
}

impl ModificationMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_unimod_entries<'a>(entries: impl IntoIterator<Item = &'a UnimodEntry>) -> Self {
        let labels = entries
            .into_iter()
            .map(|e| (format!("UNIMOD:{}", e.unimod_accession), e.name.clone()))
            .collect();
        Self { labels }
    }

    /// Parses either the unimod configuration or a plain `{raw_key: label}` object.
    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        let parsed: ModificationFile = serde_json::from_str(content)?;
        Ok(match parsed {
            ModificationFile::Unimod(config) => Self::from_unimod_entries(&config.modifications),
            ModificationFile::Plain(labels) => Self { labels },
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModificationConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| ModificationConfigError::Io {
                source,
                path: path.to_path_buf(),
            })?;
        let mapping =
            Self::from_json_str(&content).map_err(|source| ModificationConfigError::Parse {
                source,
                path: path.to_path_buf(),
            })?;
        info!(
            "Loaded {} modification labels from {}",
            mapping.len(),
            path.display()
        );
        Ok(mapping)
    }

    pub fn insert(&mut self, raw_key: impl Into<String>, label: impl Into<String>) {
        self.labels.insert(raw_key.into(), label.into());
    }

    pub fn get(&self, raw_key: &str) -> Option<&str> {
        self.labels.get(raw_key).map(|x| x.as_str())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ModificationMapping {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            labels: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unimod_config() {
        let content = r#"{
            "modifications": [
                {"name": "Acetyl", "unimod_accession": 1},
                {"name": "Oxidation", "unimod_accession": 35},
                {"name": "Carbamidomethyl", "unimod_accession": 4}
            ]
        }"#;
        let mapping = ModificationMapping::from_json_str(content).unwrap();
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.get("UNIMOD:4"), Some("Carbamidomethyl"));
        assert_eq!(mapping.get("UNIMOD:35"), Some("Oxidation"));
        assert_eq!(mapping.get("UNIMOD:21"), None);
    }

    #[test]
    fn test_plain_mapping() {
        let content = r#"{"UNIMOD:4": "Carbamidomethyl", "+15.995": "Oxidation"}"#;
        let mapping = ModificationMapping::from_json_str(content).unwrap();
        assert_eq!(mapping.get("+15.995"), Some("Oxidation"));
    }

    #[test]
    fn test_invalid_file_content() {
        assert!(ModificationMapping::from_json_str("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_from_missing_file() {
        let res = ModificationMapping::from_file("this/path/does/not/exist.json");
        assert!(matches!(res, Err(ModificationConfigError::Io { .. })));
    }
}
