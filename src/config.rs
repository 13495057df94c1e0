//! Engine settings that vary per deployment rather than per table.
//!
//! Loaded from YAML; every field is optional and falls back to the values the
//! editor has always used (`id` as identifier, `employees` without one, a
//! 500-line cap on pasted and bulk-entered text).

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ID_FIELD: &str = "id";
pub const DEFAULT_MAX_PASTE_LINES: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub id_field: String,
    /// Tables whose server-side schema has no identifier column.
    pub tables_without_id: Vec<String>,
    /// Applies to clipboard paste and bulk entry alike; `null` removes the cap.
    pub max_paste_lines: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            tables_without_id: vec!["employees".to_string()],
            max_paste_lines: Some(DEFAULT_MAX_PASTE_LINES),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config {path:?}"))?;
        let reader = BufReader::new(file);
        let config: EngineConfig = serde_yaml::from_reader(reader)
            .with_context(|| format!("Parsing YAML config from {path:?}"))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml_string()?;
        std::fs::write(path, yaml).with_context(|| format!("Writing config to {path:?}"))
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing config to YAML")
    }

    pub fn strips_id(&self, table_name: &str) -> bool {
        self.tables_without_id
            .iter()
            .any(|candidate| candidate == table_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_fields_take_defaults() {
        let config: EngineConfig = serde_yaml::from_str("id_field: pk\n").unwrap();
        assert_eq!(config.id_field, "pk");
        assert_eq!(config.tables_without_id, vec!["employees"]);
        assert_eq!(config.max_paste_lines, Some(500));
    }

    #[test]
    fn null_cap_disables_limit() {
        let config: EngineConfig = serde_yaml::from_str("max_paste_lines: null\n").unwrap();
        assert_eq!(config.max_paste_lines, None);
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("engine.yml");
        let config = EngineConfig {
            id_field: "row_id".to_string(),
            tables_without_id: vec!["audit".to_string()],
            max_paste_lines: Some(20),
        };
        config.save(&path).expect("save config");
        let loaded = EngineConfig::load(&path).expect("load config");
        assert_eq!(loaded, config);
        assert!(loaded.strips_id("audit"));
        assert!(!loaded.strips_id("employees"));
    }
}
