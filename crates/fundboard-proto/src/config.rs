use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub notices: NoticeConfig,
}

/// Where the analysis backend lives and how long we wait for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bound for listing, content, overview and settings requests.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Generation jobs run an LLM pipeline server-side and routinely take minutes.
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Start the overview poller as soon as the binary comes up.
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,
    #[serde(default = "default_overview_interval_secs")]
    pub overview_interval_secs: u64,
}

/// Local JSON API consumed by the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeConfig {
    /// Lifetime of info and success notices.
    #[serde(default = "default_info_secs")]
    pub info_secs: u64,
    #[serde(default = "default_warning_secs")]
    pub warning_secs: u64,
    #[serde(default = "default_max_queued")]
    pub max_queued: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            generation_timeout_secs: default_generation_timeout_secs(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            auto_start: default_auto_start(),
            overview_interval_secs: default_overview_interval_secs(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            info_secs: default_info_secs(),
            warning_secs: default_warning_secs(),
            max_queued: default_max_queued(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs.max(1))
    }
}

impl PollingConfig {
    pub fn overview_interval(&self) -> Duration {
        Duration::from_secs(self.overview_interval_secs.max(1))
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_generation_timeout_secs() -> u64 {
    900
}

fn default_auto_start() -> bool {
    true
}

fn default_overview_interval_secs() -> u64 {
    30
}

fn default_http_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8990
}

fn default_info_secs() -> u64 {
    5
}

fn default_warning_secs() -> u64 {
    10
}

fn default_max_queued() -> usize {
    8
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Read `path`, writing a default config there first if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
