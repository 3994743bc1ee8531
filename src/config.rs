use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_URL: &str = "http://localhost:2283/api";
const APP_DIR: &str = "immich-cull";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not load env file: {0}")]
    Env(#[from] dotenvy::Error),

    #[error("No API key configured (set X_API_KEY or IMMICH_API_KEY, or api_key in the config file)")]
    MissingApiKey,
}

/// Settings for one run.
///
/// Layered lowest to highest: defaults, TOML file, `.env` and process environment,
/// then command-line flags applied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub url: String,
    pub api_key: Option<String>,
    /// Device that owns library-less uploads.
    pub upload_device_id: Option<String>,
    pub history_file: Option<PathBuf>,
    /// Trusted path prefixes, most trusted first.
    pub priority: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            api_key: None,
            upload_device_id: None,
            history_file: None,
            priority: Vec::new(),
        }
    }
}

impl Config {
    /// `<config_dir>/immich-cull/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` (must exist) or the default location (optional), then
    /// overlay the environment, reading `env_file` or `./.env` first.
    pub fn load(path: Option<&Path>, env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(default) => Self::from_file(&default)?,
                None => Self::default(),
            },
        };

        match env_file {
            Some(env_file) => {
                dotenvy::from_path(env_file)?;
            }
            None => {
                if let Ok(found) = dotenvy::dotenv() {
                    debug!("Loaded environment from {}", found.display());
                }
            }
        }
        config.apply_env(|key| std::env::var(key).ok());

        if config.priority.is_empty() {
            warn!("Priority list is empty; every duplicate group will be skipped");
        }
        Ok(config)
    }

    /// Overlay values found through `lookup`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(*key))
                .find(|value| !value.trim().is_empty())
                .map(|value| value.trim().to_string())
        };

        if let Some(url) = get(&["IMMICH_URL"]) {
            self.url = url;
        }
        if let Some(key) = get(&["IMMICH_API_KEY", "X_API_KEY", "x_api_key"]) {
            self.api_key = Some(key);
        }
        if let Some(device) = get(&["IMMICH_UPLOAD_DEVICE_ID"]) {
            self.upload_device_id = Some(device);
        }
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Where resolution history is appended.
    pub fn history_path(&self) -> PathBuf {
        if let Some(path) = &self.history_file {
            return path.clone();
        }
        match dirs::data_dir() {
            Some(dir) => dir.join(APP_DIR).join("history.jsonl"),
            None => PathBuf::from(".history.jsonl"),
        }
    }
}
