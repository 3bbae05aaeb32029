//! famcal configuration.
//!
//! Loaded from `~/.config/famcal/config.toml`, overridable with `FAMCAL_*`
//! environment variables (`FAMCAL_BACKEND__URL`, `FAMCAL_HOLIDAY_ENDPOINT`, ...).

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TOAST_MILLIS, EVENTS_FILE, SESSION_FILE};
use crate::error::{FamcalError, FamcalResult};

static DEFAULT_DATA_DIR: &str = "~/.local/share/famcal";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_toast_millis() -> u64 {
    DEFAULT_TOAST_MILLIS
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

/// Hosted backend connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Without a backend the calendar runs in local-only mode.
    #[serde(default)]
    pub backend: Option<BackendConfig>,

    /// Holiday lookup URL, queried with `?year=YYYY`.
    #[serde(default)]
    pub holiday_endpoint: Option<String>,

    #[serde(default = "default_toast_millis")]
    pub toast_millis: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: default_data_dir(),
            backend: None,
            holiday_endpoint: None,
            toast_millis: DEFAULT_TOAST_MILLIS,
        }
    }
}

impl AppConfig {
    pub fn config_path() -> FamcalResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| FamcalError::Config("Could not determine config directory".into()))?
            .join("famcal");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the user's config, writing a commented default on first run.
    pub fn load() -> FamcalResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> FamcalResult<Self> {
        Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("FAMCAL").separator("__"))
            .build()
            .map_err(|e| FamcalError::Config(e.to_string()))?
            .try_deserialize::<AppConfig>()
            .map_err(|e| FamcalError::Config(e.to_string()))
            .map(AppConfig::normalized)
    }

    fn normalized(mut self) -> Self {
        self.holiday_endpoint = self
            .holiday_endpoint
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        self.backend = self
            .backend
            .filter(|b| !b.url.trim().is_empty() && !b.anon_key.trim().is_empty());
        self
    }

    pub fn data_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();
        PathBuf::from(expanded)
    }

    pub fn events_path(&self) -> PathBuf {
        self.data_path().join(EVENTS_FILE)
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_path().join(SESSION_FILE)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_millis)
    }

    pub fn is_local_only(&self) -> bool {
        self.backend.is_none()
    }

    /// Create a config file with every option commented out.
    pub fn create_default_config(path: &Path) -> FamcalResult<()> {
        let contents = format!(
            "\
# famcal configuration

# Where events and the login session are stored:
# data_dir = \"{}\"

# Hosted backend (leave out to keep everything on this machine):
# [backend]
# url = \"https://your-project.example.co\"
# anon_key = \"public-anon-key\"
# poll_interval_secs = {}

# Holiday lookup endpoint, queried with ?year=YYYY:
# holiday_endpoint = \"https://holidays.example.com/api\"

# How long notifications stay up:
# toast_millis = {}
",
            DEFAULT_DATA_DIR, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TOAST_MILLIS
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FamcalError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| FamcalError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commented_default_config_loads_local_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        AppConfig::create_default_config(&path).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert!(config.is_local_only());
        assert_eq!(config.toast_millis, DEFAULT_TOAST_MILLIS);
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
    }

    #[test]
    fn backend_table_enables_remote_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "data_dir = \"/tmp/famcal-test\"\n\
             holiday_endpoint = \"  \"\n\
             [backend]\n\
             url = \"https://db.example.co/\"\n\
             anon_key = \"k\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        let backend = config.backend.as_ref().unwrap();
        assert_eq!(backend.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert!(config.holiday_endpoint.is_none());
        assert_eq!(config.events_path(), PathBuf::from("/tmp/famcal-test/events.json"));
    }
}
