use crate::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_SECONDS, DEFAULT_USER_AGENT, EVENTS_COLLECTION,
    LISTING_URL,
};
use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scraper: ScraperConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub listing_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            listing_url: LISTING_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl ScraperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub collection: String,
    /// Max in-flight image fetches / existence lookups
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collection: EVENTS_COLLECTION.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectBackend {
    Local,
    Supabase,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub object_backend: ObjectBackend,
    /// Public base URL the local object directory is served under
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            object_backend: ObjectBackend::Local,
            public_base_url: "http://localhost:8080/images".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Daily trigger; defaults to 08:00 Taiwan time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub hour: u32,
    pub minute: u32,
    pub utc_offset_hours: i32,
    pub retry_count: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hour: 8,
            minute: 0,
            utc_offset_hours: 8,
            retry_count: 3,
        }
    }
}

/// Where and how much to log. `RUST_LOG` still wins over `level`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    pub file_prefix: String,
    pub level: String,
    /// Mirror log lines to stdout
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            file_prefix: "scraper.log".to_string(),
            level: "doujin_scraper=info".to_string(),
            console: true,
        }
    }
}

impl Config {
    /// Load `path` if it exists (defaults otherwise), then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let config_content = fs::read_to_string(path).map_err(|e| {
                ScraperError::Config(format!("Failed to read config file {:?}: {}", path, e))
            })?;
            Self::from_toml(&config_content)?
        } else {
            Config::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("DOUJIN_LISTING_URL") {
            self.scraper.listing_url = v;
        }
        if let Ok(v) = std::env::var("DOUJIN_DATA_DIR") {
            self.storage.data_dir = v;
        }
        if let Ok(v) = std::env::var("DOUJIN_PUBLIC_BASE_URL") {
            self.storage.public_base_url = v;
        }
        if let Ok(v) = std::env::var("DOUJIN_LOG_DIR") {
            self.logging.dir = v;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.scraper.listing_url.trim().is_empty() {
            return Err(ScraperError::Config("scraper.listing_url is empty".into()));
        }
        if self.scraper.timeout_seconds == 0 {
            return Err(ScraperError::Config("scraper.timeout_seconds must be > 0".into()));
        }
        if self.pipeline.concurrency == 0 {
            return Err(ScraperError::Config("pipeline.concurrency must be > 0".into()));
        }
        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            return Err(ScraperError::Config(format!(
                "schedule time {:02}:{:02} is not a valid time of day",
                self.schedule.hour, self.schedule.minute
            )));
        }
        if self.schedule.utc_offset_hours.abs() > 14 {
            return Err(ScraperError::Config("schedule.utc_offset_hours out of range".into()));
        }
        if self.logging.dir.trim().is_empty() || self.logging.file_prefix.trim().is_empty() {
            return Err(ScraperError::Config("logging.dir and logging.file_prefix must be set".into()));
        }
        Ok(())
    }
}
