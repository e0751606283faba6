//! Configuration - financial settings, job rules and extractor options
//!
//! Layers, later wins: built-in defaults, the user config file, then
//! `ridge.yaml` in the working directory (or an explicit `--config` path).
//! The calculators never read configuration; callers pass values in.

use serde::{Deserialize, Serialize};
use serde_yml::{Mapping, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::buildings::{default_equipment_rules, JobRules};
use crate::core::cascade::FinancialSettings;

/// Project-local config file name
pub const PROJECT_CONFIG_FILE: &str = "ridge.yaml";

/// External extraction command settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Shell command receiving the prompt on stdin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Hard timeout for one call
    pub timeout_secs: u64,

    /// Token budget passed to the command
    pub max_tokens: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            command: None,
            timeout_secs: 15,
            max_tokens: 2048,
        }
    }
}

/// Effective configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub financial: FinancialSettings,

    pub job: JobRules,

    pub extractor: ExtractorConfig,

    /// Catalog file used instead of the built-in catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,

    /// Directory for per-user catalog files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            financial: FinancialSettings::default(),
            job: JobRules {
                labor_item_id: Some("roofing-labor".to_string()),
                equipment_rules: default_equipment_rules(),
            },
            extractor: ExtractorConfig::default(),
            catalog: None,
            store_dir: None,
        }
    }
}

/// Errors loading or updating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Could not determine a user configuration directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Config {
    /// Path of the per-user config file
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "ridgeline", "ridge")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Default directory for per-user catalog files
    pub fn default_store_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "ridgeline", "ridge")
            .map(|dirs| dirs.data_dir().join("catalogs"))
    }

    /// Load defaults, the user file, then the project file or `explicit`
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        if let Some(user) = Self::user_config_path() {
            layers.push(user);
        }
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("config file not found: {}", path.display()),
                    )));
                }
                layers.push(path.to_path_buf());
            }
            None => layers.push(PathBuf::from(PROJECT_CONFIG_FILE)),
        }
        Self::load_layers(&layers)
    }

    /// Merge the given files (missing files are skipped) over the defaults
    pub fn load_layers(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut merged = to_value(&Config::default())?;
        for path in paths {
            if !path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(path)?;
            let overlay: Value = serde_yml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            tracing::debug!(path = %path.display(), "merging config layer");
            merge(&mut merged, overlay);
        }
        let config: Config = serde_yml::from_value(merged).map_err(|e| ConfigError::Parse {
            path: "merged configuration".to_string(),
            message: e.to_string(),
        })?;
        config.check()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with
    pub fn check(&self) -> Result<(), ConfigError> {
        self.financial
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.extractor.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "extractor.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Set a dotted key (e.g. `financial.margin_percent`) in a config file
    ///
    /// The file is only written when the resulting configuration is valid.
    pub fn set_in_file(path: &Path, key: &str, raw_value: &str) -> Result<Config, ConfigError> {
        let known = to_value(&Config::default())?;
        if lookup(&known, key).is_none() && !is_optional_key(key) {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut file_value = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
        } else {
            Value::Mapping(Mapping::new())
        };
        if file_value.is_null() {
            file_value = Value::Mapping(Mapping::new());
        }

        let parsed: Value =
            serde_yml::from_str(raw_value).unwrap_or_else(|_| Value::String(raw_value.to_string()));
        insert(&mut file_value, key, parsed)?;

        let mut merged = known;
        merge(&mut merged, file_value.clone());
        let config: Config = serde_yml::from_value(merged)
            .map_err(|e| ConfigError::Invalid(format!("{}: {}", key, e)))?;
        config.check()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yml::to_string(&file_value).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let unchanged = std::fs::read_to_string(path).is_ok_and(|old| old == content);
        if !unchanged {
            std::fs::write(path, content)?;
        }
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yml::to_string(self).map_err(|e| ConfigError::Parse {
            path: "configuration".to_string(),
            message: e.to_string(),
        })
    }
}

fn is_optional_key(key: &str) -> bool {
    matches!(
        key,
        "catalog" | "store_dir" | "extractor.command" | "job.labor_item_id"
    )
}

fn to_value(config: &Config) -> Result<Value, ConfigError> {
    serde_yml::to_value(config).map_err(|e| ConfigError::Parse {
        path: "defaults".to_string(),
        message: e.to_string(),
    })
}

/// Deep-merge `overlay` into `base`; mappings merge, everything else replaces
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (slot, value) => *slot = value,
    }
}

fn lookup<'a>(value: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(value, |current, part| current.as_mapping()?.get(part))
}

fn insert(root: &mut Value, dotted: &str, new_value: Value) -> Result<(), ConfigError> {
    let parts: Vec<&str> = dotted.split('.').collect();
    let mut current = root;
    for (i, part) in parts.iter().enumerate() {
        let map = current
            .as_mapping_mut()
            .ok_or_else(|| ConfigError::UnknownKey(dotted.to_string()))?;
        let key = Value::String(part.to_string());
        if i == parts.len() - 1 {
            map.insert(key, new_value);
            return Ok(());
        }
        current = map
            .entry(key)
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }
    Ok(())
}
