//! Document type to workbook path configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BizsheetError, Result};

/// Configuration file looked up in the working directory
pub const DEFAULT_PATHS_FILE: &str = "bizsheet_paths.json";

/// Workbook keys present even when unconfigured
pub const DEFAULT_WORKBOOK_KEYS: [&str; 3] = ["전기", "통신", "소방"];

/// Workbook path per key; an empty path means not configured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathConfig {
    pub workbooks: BTreeMap<String, String>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            workbooks: DEFAULT_WORKBOOK_KEYS
                .iter()
                .map(|k| (k.to_string(), String::new()))
                .collect(),
        }
    }
}

impl PathConfig {
    /// Load from a JSON file, layered over the defaults. A missing file gives
    /// the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::default();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no path configuration, using defaults");
            return Ok(config);
        }
        let content = fs::read_to_string(path).map_err(|e| {
            BizsheetError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let stored: BTreeMap<String, String> = serde_json::from_str(&content).map_err(|e| {
            BizsheetError::Config(format!("Invalid path configuration {}: {}", path.display(), e))
        })?;
        config.workbooks.extend(stored);
        Ok(config)
    }

    /// Write as pretty-printed UTF-8 JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BizsheetError::Config(e.to_string()))?;
        fs::write(path, json).map_err(|e| {
            BizsheetError::Config(format!("Failed to write {}: {}", path.display(), e))
        })?;
        tracing::info!(path = %path.display(), "path configuration saved");
        Ok(())
    }

    pub fn set_path(&mut self, key: &str, workbook: impl AsRef<Path>) {
        self.workbooks.insert(
            key.to_string(),
            workbook.as_ref().to_string_lossy().into_owned(),
        );
    }

    /// Configured workbook for a key
    pub fn workbook(&self, key: &str) -> Option<PathBuf> {
        self.workbooks
            .get(key)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Workbook key for a document type: the first known key it contains.
    ///
    /// `전기 시평` maps to `전기`. The key also names the threshold ruleset.
    pub fn workbook_key_for<'a>(&'a self, doc_type: &str) -> Option<&'a str> {
        let mut keys: Vec<&str> = DEFAULT_WORKBOOK_KEYS.to_vec();
        keys.extend(self.workbooks.keys().map(String::as_str));
        keys.into_iter()
            .find(|key| doc_type.contains(key))
            .and_then(|key| self.workbooks.get_key_value(key))
            .map(|(k, _)| k.as_str())
    }

    /// Configured workbooks in key order
    pub fn configured(&self) -> Vec<(&str, PathBuf)> {
        self.workbooks
            .keys()
            .filter_map(|k| self.workbook(k).map(|p| (k.as_str(), p)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_unset() {
        let config = PathConfig::default();
        assert_eq!(config.workbooks.len(), 3);
        assert!(config.workbook("전기").is_none());
        assert!(config.configured().is_empty());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PathConfig::load(dir.path().join(DEFAULT_PATHS_FILE)).unwrap();
        assert_eq!(config, PathConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(DEFAULT_PATHS_FILE);
        let mut config = PathConfig::default();
        config.set_path("통신", "/data/통신DB.xlsx");
        config.save(&file).unwrap();

        let text = fs::read_to_string(&file).unwrap();
        assert!(text.contains("\"통신\": \"/data/통신DB.xlsx\""));

        let loaded = PathConfig::load(&file).unwrap();
        assert_eq!(loaded.workbook("통신"), Some(PathBuf::from("/data/통신DB.xlsx")));
        assert_eq!(loaded.configured().len(), 1);
    }

    #[test]
    fn test_partial_file_is_layered_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("paths.json");
        fs::write(&file, r#"{"소방": "fire.xlsx", "기계": "mech.xlsx"}"#).unwrap();
        let config = PathConfig::load(&file).unwrap();
        assert_eq!(config.workbooks.len(), 4);
        assert_eq!(config.workbook_key_for("기계 경영상태"), Some("기계"));

        fs::write(&file, "not json").unwrap();
        assert!(PathConfig::load(&file).is_err());
    }

    #[test]
    fn test_workbook_key_for_doc_type() {
        let config = PathConfig::default();
        assert_eq!(config.workbook_key_for("전기 경영상태"), Some("전기"));
        assert_eq!(config.workbook_key_for("정보통신"), Some("통신"));
        assert_eq!(config.workbook_key_for("소방시설"), Some("소방"));
        assert_eq!(config.workbook_key_for("건축"), None);
    }
}
