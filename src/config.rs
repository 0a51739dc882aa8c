//! # Detection Configuration (refminer.yml)
//!
//! Thresholds, worker-pool limits and the rule order. Values come from the
//! defaults, then a `refminer.yml` found by walking up from the working
//! directory (or `~/.refminer/config.yml`), then CLI overrides.

use crate::errors::ServiceError;
use crate::refactoring::RuleId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAMES: &[&str] = &["refminer.yml", "refminer.yaml"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiffConfig {
    /// Maximum file size to load (in bytes)
    pub max_file_size: u64,
    /// Maximum number of files parsed concurrently
    pub max_concurrency: usize,
    /// Maximum number of per-file models to cache (default: 1000)
    pub model_cache_size: usize,
    /// Glob patterns of files to load from a snapshot directory
    pub include: Vec<String>,
    /// Minimum member overlap for pairing classes whose names differ
    pub class_similarity_threshold: f64,
    /// Minimum mapping ratio for Rename Operation
    pub operation_mapping_threshold: f64,
    /// Minimum share of an extracted/inlined body that must map back
    pub extract_operation_threshold: f64,
    /// Upper bound on substitutions explaining one replacement mapping
    pub max_replacements: usize,
    /// Inference rule order; first match claims a delta
    pub rule_order: Vec<RuleId>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024, // 50MB
            max_concurrency: 10,
            model_cache_size: 1000,
            include: vec!["**/*.py".to_string(), "**/*.java".to_string()],
            class_similarity_threshold: 0.5,
            operation_mapping_threshold: 0.5,
            extract_operation_threshold: 0.5,
            max_replacements: 4,
            rule_order: RuleId::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl DiffConfig {
    /// Load configuration from a refminer.yml file
    pub fn from_file(path: &Path) -> Result<Self, ServiceError> {
        if !path.exists() {
            return Err(ServiceError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ServiceError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Find refminer.yml by traversing up the directory tree
    pub fn discover(start_dir: &Path) -> Result<Option<(PathBuf, Self)>, ServiceError> {
        let mut current = start_dir;
        loop {
            for name in CONFIG_FILE_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    let config = Self::from_file(&config_path)?;
                    return Ok(Some((config_path, config)));
                }
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(None)
    }

    /// Per-user configuration, `~/.refminer/config.yml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".refminer").join("config.yml"))
    }

    /// Project configuration if one is found, else the user configuration,
    /// else the defaults
    pub fn load(start_dir: &Path) -> Result<Self, ServiceError> {
        if let Some((path, config)) = Self::discover(start_dir)? {
            tracing::debug!("Using configuration from {}", path.display());
            return Ok(config);
        }
        match Self::user_config_path() {
            Some(path) if path.exists() => {
                tracing::debug!("Using configuration from {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ServiceError> {
        for (name, value) in [
            ("classSimilarityThreshold", self.class_similarity_threshold),
            ("operationMappingThreshold", self.operation_mapping_threshold),
            ("extractOperationThreshold", self.extract_operation_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ServiceError::Internal(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }
        if self.max_concurrency == 0 {
            return Err(ServiceError::Internal(
                "maxConcurrency must be at least 1".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(duplicate) = self.rule_order.iter().find(|id| !seen.insert(**id)) {
            return Err(ServiceError::Internal(format!(
                "rule {duplicate} appears twice in ruleOrder"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = DiffConfig::default();
        assert_eq!(config.max_concurrency, 10);
        assert_eq!(config.rule_order.first(), Some(&RuleId::ClassRenameMove));
        assert_eq!(config.rule_order.len(), RuleId::DEFAULT_ORDER.len());
    }

    #[test]
    fn test_parse_partial_config() {
        let yaml = r#"
maxConcurrency: 2
classSimilarityThreshold: 0.7
ruleOrder:
  - replace-variable-with-attribute
  - extract-attribute
"#;
        let config = DiffConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.class_similarity_threshold, 0.7);
        assert_eq!(
            config.rule_order,
            vec![RuleId::ReplaceVariableWithAttribute, RuleId::ExtractAttribute]
        );
        assert_eq!(config.max_file_size, 50 * 1024 * 1024);
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let err = DiffConfig::from_yaml("operationMappingThreshold: 1.5\n").unwrap_err();
        assert!(err.to_string().contains("operationMappingThreshold"));
    }

    #[test]
    fn test_rejects_duplicate_rule() {
        let yaml = "ruleOrder: [rename-operation, rename-operation]\n";
        assert!(DiffConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_discover_config() {
        let temp_dir = TempDir::new().unwrap();
        let sub_dir = temp_dir.path().join("src").join("pkg");
        fs::create_dir_all(&sub_dir).unwrap();
        fs::write(temp_dir.path().join("refminer.yml"), "maxReplacements: 2\n").unwrap();

        let (path, config) = DiffConfig::discover(&sub_dir).unwrap().unwrap();
        assert_eq!(path, temp_dir.path().join("refminer.yml"));
        assert_eq!(config.max_replacements, 2);
    }
}
