//! Application settings.
//!
//! Layered from built-in defaults, an optional TOML file and `REELCRAWL_*`
//! environment variables (nested keys use `__`, e.g.
//! `REELCRAWL_SERVER__PORT=9000`). Later layers win.

use crate::engine::{HttpTransportConfig, ScraperConfig};
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable holding the settings file path
pub const CONFIG_PATH_ENV: &str = "REELCRAWL_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "reelcrawl.toml";
const ENV_PREFIX: &str = "REELCRAWL";

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub engine: EngineSettings,
    pub download: DownloadSettings,
    pub api: ApiSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Engine used when a request names none
    pub default_engine: String,
    pub max_concurrent_requests: usize,
    pub max_detail_depth: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub use_cache: bool,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
    /// Engine ids whose primary page goes through the challenge solver
    pub challenge_engines: Vec<String>,
    /// FlareSolverr-compatible endpoint, e.g. http://localhost:8191/
    pub challenge_solver_url: Option<Url>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let http = HttpTransportConfig::default();
        let scraper = ScraperConfig::default();
        Self {
            default_engine: "netnaija".to_string(),
            max_concurrent_requests: scraper.max_concurrent_requests,
            max_detail_depth: scraper.max_detail_depth,
            request_timeout_secs: http.timeout.as_secs(),
            user_agent: http.user_agent,
            use_cache: http.use_cache,
            cache_ttl_secs: http.cache_ttl.as_secs(),
            cache_max_entries: http.cache_max_entries,
            challenge_engines: scraper.challenge_engines,
            challenge_solver_url: None,
        }
    }
}

impl EngineSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scraper_config(&self) -> ScraperConfig {
        ScraperConfig {
            max_concurrent_requests: self.max_concurrent_requests,
            max_detail_depth: self.max_detail_depth,
            challenge_engines: self.challenge_engines.clone(),
        }
    }

    pub fn http_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            user_agent: self.user_agent.clone(),
            timeout: self.request_timeout(),
            use_cache: self.use_cache,
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            cache_max_entries: self.cache_max_entries,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Files land in `<output_dir>/<title>/`
    pub output_dir: PathBuf,
    /// Holds the resume list
    pub state_dir: PathBuf,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        let output_dir = dirs::download_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reelcrawl");
        let state_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("reelcrawl");
        Self {
            output_dir,
            state_dir,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// When non-empty, every API request needs an `x-api-key` from this list
    pub allowed_keys: Vec<String>,
    pub allowed_origins: Vec<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            allowed_keys: Vec::new(),
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Write daily-rolled log files here as well as to stdout
    pub dir: Option<PathBuf>,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            json: false,
        }
    }
}

impl Settings {
    /// Load from the file named by `REELCRAWL_CONFIG`, or `reelcrawl.toml` if present
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load_from(Some(Path::new(&path))),
            None => Self::load_from(None),
        }
    }

    /// Load with `path` as the settings file. An explicit path must exist.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE)
                .format(FileFormat::Toml)
                .required(false),
        };

        let settings: Self = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("engine.challenge_engines")
                    .with_list_parse_key("api.allowed_keys")
                    .with_list_parse_key("api.allowed_origins")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.engine.max_concurrent_requests == 0 {
            return Err(SettingsError::Invalid {
                key: "engine.max_concurrent_requests",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.engine.request_timeout_secs == 0 {
            return Err(SettingsError::Invalid {
                key: "engine.request_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Address the API server binds to
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
