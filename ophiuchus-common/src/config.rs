//! Configuration loading and data folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Content generator collaborator settings
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    /// Completion endpoint URL
    pub endpoint: String,
    /// Bearer key for the generator service
    #[serde(default)]
    pub api_key: String,
    /// Request timeout in seconds
    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,
}

fn default_generator_timeout() -> u64 {
    30
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5870/v1/generate".to_string(),
            api_key: String::new(),
            timeout_secs: default_generator_timeout(),
        }
    }
}

/// Track oracle (music catalog) settings
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Base URL of the catalog API
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
}

fn default_oracle_timeout() -> u64 {
    15
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.spotify.com/v1".to_string(),
            timeout_secs: default_oracle_timeout(),
        }
    }
}

/// Service configuration for ophiuchus-quest
#[derive(Debug, Clone, Deserialize, Default)]
pub struct QuestConfig {
    /// Listen address, host:port
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Data folder holding ophiuchus.db; resolved separately when absent
    #[serde(default)]
    pub data_folder: Option<PathBuf>,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
}

fn default_bind_address() -> String {
    "127.0.0.1:5830".to_string()
}

impl QuestConfig {
    /// Load configuration following the priority order:
    /// 1. Explicit config file path (command-line argument)
    /// 2. OPHIUCHUS_CONFIG environment variable
    /// 3. Platform config directory (e.g. ~/.config/ophiuchus/config.toml)
    /// 4. Compiled defaults
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_path {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var("OPHIUCHUS_CONFIG") {
            return Self::from_file(Path::new(&path));
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self {
            bind_address: default_bind_address(),
            ..Self::default()
        })
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Resolve the database file path.
    ///
    /// Data folder priority: config value, then OPHIUCHUS_DATA environment
    /// variable, then OS-dependent default.
    pub fn database_path(&self) -> PathBuf {
        self.resolve_data_folder().join("ophiuchus.db")
    }

    fn resolve_data_folder(&self) -> PathBuf {
        if let Some(folder) = &self.data_folder {
            return folder.clone();
        }

        if let Ok(folder) = std::env::var("OPHIUCHUS_DATA") {
            return PathBuf::from(folder);
        }

        default_data_folder()
    }
}

/// Platform config file location
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ophiuchus").join("config.toml"))
}

/// OS-dependent default data folder
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("ophiuchus"))
        .unwrap_or_else(|| PathBuf::from("./ophiuchus_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_no_config_present() {
        let config = QuestConfig::default();
        assert!(config.data_folder.is_none());
        assert_eq!(config.generator.timeout_secs, 30);
        assert_eq!(config.oracle.base_url, "https://api.spotify.com/v1");
    }

    #[test]
    fn test_from_file_parses_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
bind_address = "0.0.0.0:9000"

[generator]
endpoint = "http://gen.local/v1/generate"
api_key = "k"
"#,
        )
        .unwrap();

        let config = QuestConfig::from_file(&path).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:9000");
        assert_eq!(config.generator.endpoint, "http://gen.local/v1/generate");
        // Unspecified sections fall back to defaults
        assert_eq!(config.generator.timeout_secs, 30);
        assert_eq!(config.oracle.timeout_secs, 15);
    }

    #[test]
    fn test_from_file_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "bind_address = [not toml").unwrap();
        assert!(QuestConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_explicit_data_folder_wins() {
        let config = QuestConfig {
            data_folder: Some(PathBuf::from("/tmp/ophi-test")),
            ..Default::default()
        };
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/ophi-test/ophiuchus.db")
        );
    }
}
