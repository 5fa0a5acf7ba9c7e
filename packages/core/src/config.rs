//! Configuration for graph management, relocation and matching
use crate::models::MAX_NAME_LENGTH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Name given to graphs created implicitly by the first node
    pub default_graph_name: String,

    /// Longest accepted node/graph name; longer names are rejected
    pub max_name_length: usize,

    /// Graph store directory (`~/.codetrail/graphs` when unset)
    pub storage_dir: Option<PathBuf>,

    pub relocation: RelocationConfig,

    pub matcher: MatcherConfig,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            default_graph_name: "Code Trail".to_string(),
            max_name_length: MAX_NAME_LENGTH,
            storage_dir: None,
            relocation: RelocationConfig::default(),
            matcher: MatcherConfig::default(),
        }
    }
}

/// How far and how loosely the location tracker searches for drifted code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelocationConfig {
    /// Lines searched above and below the recorded line
    pub search_radius: u32,

    /// Matches at most this many lines away are `high` confidence, the rest `medium`
    pub high_confidence_distance: u32,

    /// Minimum normalized similarity for a `low` confidence suggestion
    pub fuzzy_match_threshold: f64,
}

impl Default for RelocationConfig {
    fn default() -> Self {
        Self {
            search_radius: 50,
            high_confidence_distance: 5,
            fuzzy_match_threshold: 0.8,
        }
    }
}

/// Node matcher tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Line distance considered "near" for proximity search
    pub proximity_window: u32,

    /// Levenshtein similarity a name must exceed to count as a fuzzy match
    pub levenshtein_threshold: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            proximity_window: 10,
            levenshtein_threshold: 0.4,
        }
    }
}

impl TrailConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate().map_err(ConfigError::Invalid)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Get the graph store directory, resolving it to ~/.codetrail/graphs/
    ///
    /// - macOS/Linux: ~/.codetrail/graphs/
    /// - Windows: %USERPROFILE%\.codetrail\graphs\
    pub fn resolve_storage_dir(&self) -> Result<PathBuf, std::io::Error> {
        if let Some(dir) = &self.storage_dir {
            return Ok(dir.clone());
        }

        let home_dir = dirs::home_dir().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Cannot determine home directory",
            )
        })?;

        Ok(home_dir.join(".codetrail").join("graphs"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_graph_name.trim().is_empty() {
            return Err("default_graph_name cannot be empty".to_string());
        }

        if self.max_name_length == 0 {
            return Err("max_name_length must be greater than 0".to_string());
        }

        self.relocation.validate()?;
        self.matcher.validate()
    }
}

impl RelocationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.search_radius == 0 {
            return Err("search_radius must be greater than 0".to_string());
        }

        if self.high_confidence_distance > self.search_radius {
            return Err(format!(
                "high_confidence_distance ({}) cannot exceed search_radius ({})",
                self.high_confidence_distance, self.search_radius
            ));
        }

        check_unit_interval("fuzzy_match_threshold", self.fuzzy_match_threshold)
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<(), String> {
        check_unit_interval("levenshtein_threshold", self.levenshtein_threshold)
    }
}

fn check_unit_interval(field: &str, value: f64) -> Result<(), String> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(format!("{} must be in (0, 1], got {}", field, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = TrailConfig::default();
        assert_eq!(config.default_graph_name, "Code Trail");
        assert_eq!(config.max_name_length, 200);
        assert_eq!(config.relocation.search_radius, 50);
        assert_eq!(config.relocation.high_confidence_distance, 5);
        assert_eq!(config.matcher.proximity_window, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = TrailConfig::default();

        // Invalid: empty graph name
        config.default_graph_name = "  ".to_string();
        assert!(config.validate().is_err());

        // Invalid: zero radius
        config.default_graph_name = "Trail".to_string();
        config.relocation.search_radius = 0;
        assert!(config.validate().is_err());

        // Invalid: high-confidence distance past the radius
        config.relocation.search_radius = 3;
        assert!(config.validate().is_err());

        // Invalid: threshold outside (0, 1]
        config.relocation.search_radius = 50;
        config.matcher.levenshtein_threshold = 0.0;
        assert!(config.validate().is_err());
        config.matcher.levenshtein_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_storage_dir_wins() {
        let config = TrailConfig {
            storage_dir: Some(PathBuf::from("/tmp/trails")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_storage_dir().unwrap(),
            PathBuf::from("/tmp/trails")
        );
    }

    #[tokio::test]
    async fn test_load_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("codetrail.json");
        std::fs::write(
            &path,
            r#"{ "defaultGraphName": "ignored", "relocation": { "search_radius": 20 } }"#,
        )
        .unwrap();

        let config = TrailConfig::load(&path).await.unwrap();
        assert_eq!(config.default_graph_name, "Code Trail");
        assert_eq!(config.relocation.search_radius, 20);
        assert_eq!(config.relocation.high_confidence_distance, 5);
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("codetrail.json");
        std::fs::write(&path, r#"{ "max_name_length": 0 }"#).unwrap();

        assert!(matches!(
            TrailConfig::load(&path).await,
            Err(ConfigError::Invalid(_))
        ));
    }
}
