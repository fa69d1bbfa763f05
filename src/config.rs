use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming a config file when `--config` is absent
pub const CONFIG_ENV: &str = "SVG2DXF_CONFIG";

/// Root of the TOML configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    /// Maximum distance between a curve and its flattened polyline, in output units
    #[serde(default = "AppConfig::default_flatness")]
    pub flatness: f64,
    #[serde(default)]
    pub inkscape: InkscapeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    fn default_flatness() -> f64 {
        0.2
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `explicit` if given, else the file named by `$SVG2DXF_CONFIG`,
    /// else fall back to defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }
        Ok(Self::default())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            flatness: Self::default_flatness(),
            inkscape: InkscapeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// How the external normalization step is run
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InkscapeConfig {
    #[serde(default = "InkscapeConfig::default_program")]
    pub program: PathBuf,
    #[serde(default = "InkscapeConfig::default_enabled")]
    pub enabled: bool,
    /// Variables removed from the child's environment
    #[serde(default)]
    pub remove_env: Vec<String>,
    /// Variables set in the child's environment
    #[serde(default)]
    pub set_env: BTreeMap<String, String>,
}

impl InkscapeConfig {
    fn default_program() -> PathBuf {
        PathBuf::from("inkscape")
    }

    fn default_enabled() -> bool {
        true
    }
}

impl Default for InkscapeConfig {
    fn default() -> Self {
        Self {
            program: Self::default_program(),
            enabled: Self::default_enabled(),
            remove_env: Vec::new(),
            set_env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "warn".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.flatness, 0.2);
        assert_eq!(config.inkscape.program, PathBuf::from("inkscape"));
        assert!(config.inkscape.enabled);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
flatness = 0.05

[inkscape]
remove_env = ["LANG"]
set_env = { LC_ALL = "C" }
"#,
        )
        .unwrap();
        assert_eq!(config.flatness, 0.05);
        assert!(config.inkscape.enabled);
        assert_eq!(config.inkscape.remove_env, vec!["LANG".to_string()]);
        assert_eq!(config.inkscape.set_env.get("LC_ALL").map(String::as_str), Some("C"));
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_from_file_errors_carry_path() {
        let missing = AppConfig::from_file("/nonexistent/svg2dxf.toml");
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "flatness = \"fine\"").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(&err, ConfigError::Parse { path, .. } if path == file.path()));
    }

    #[test]
    fn test_discover_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"").unwrap();
        let config = AppConfig::discover(Some(file.path())).unwrap();
        assert_eq!(config.logging.level, "debug");
    }
}
