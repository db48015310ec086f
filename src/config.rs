// ⚙️ Configuration
//
// Resolution order (last wins):
//   defaults -> TOML file (zello.toml or $ZELLO_CONFIG) -> ZELLO_* env vars

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "zello.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file; created on first run
    pub database_path: PathBuf,
    pub bind_addr: String,
    /// `tracing_subscriber::EnvFilter` directive, e.g. `zello=debug,info`
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from("zello.db"),
            bind_addr: "0.0.0.0:3000".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Apply `ZELLO_DATABASE`, `ZELLO_BIND` and `ZELLO_LOG` overrides.
    /// `lookup` is `std::env::var` in production.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup("ZELLO_DATABASE") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(bind) = lookup("ZELLO_BIND") {
            self.bind_addr = bind;
        }
        if let Some(filter) = lookup("ZELLO_LOG") {
            self.log_filter = filter;
        }
        self
    }

    /// Full resolution against the real environment.
    ///
    /// An explicit `ZELLO_CONFIG` must exist; the default `zello.toml` is
    /// optional.
    pub fn load() -> Result<Self, ConfigError> {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        let base = match env("ZELLO_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        Ok(base.with_overrides(env))
    }
}
