use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{model::Coordinate, provider::weatherapi::DEFAULT_BASE_URL};

const DEFAULT_IP_LOCATOR_URL: &str = "http://ip-api.com/json";
const DEFAULT_PROBE: &str = "api.weatherapi.com:443";

/// Moscow, used when neither a fix nor a cached location is available.
pub const DEFAULT_FALLBACK: Coordinate = Coordinate::new(55.7558, 37.6173);

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// lang = "en"
/// location_consent = true
///
/// [fallback]
/// latitude = 52.52
/// longitude = 13.405
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// weatherapi.com key.
    pub api_key: Option<String>,

    #[serde(default = "default_lang")]
    pub lang: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_location_timeout_secs")]
    pub location_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// `None` until the user has been asked.
    #[serde(default)]
    pub location_consent: Option<bool>,

    #[serde(default = "default_ip_locator_url")]
    pub ip_locator_url: String,

    #[serde(default = "default_probe")]
    pub connectivity_probe: String,

    #[serde(default = "default_connectivity_interval_secs")]
    pub connectivity_interval_secs: u64,

    /// Where the last location and snapshot are kept.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Last-resort coordinate. Must stay the last field: TOML tables follow plain keys.
    #[serde(default = "default_fallback")]
    pub fallback: Coordinate,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            lang: default_lang(),
            base_url: default_base_url(),
            location_timeout_secs: default_location_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            location_consent: None,
            ip_locator_url: default_ip_locator_url(),
            connectivity_probe: default_probe(),
            connectivity_interval_secs: default_connectivity_interval_secs(),
            data_dir: None,
            fallback: default_fallback(),
        }
    }
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_location_timeout_secs() -> u64 {
    3
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_fallback() -> Coordinate {
    DEFAULT_FALLBACK
}

fn default_ip_locator_url() -> String {
    DEFAULT_IP_LOCATOR_URL.to_string()
}

fn default_probe() -> String {
    DEFAULT_PROBE.to_string()
}

fn default_connectivity_interval_secs() -> u64 {
    5
}

impl Config {
    /// Returns the API key or an error with a hint on how to set it.
    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `nowcast configure` and enter your weatherapi.com key."
            )
        })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_secs(self.location_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connectivity_interval(&self) -> Duration {
        Duration::from_secs(self.connectivity_interval_secs.max(1))
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory holding the cached location and snapshot.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.data_dir().to_path_buf()),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "nowcast", "nowcast")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}
