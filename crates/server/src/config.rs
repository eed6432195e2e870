use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const CONFIG_PATH_VAR: &str = "TALLY_CONFIG";
const DEFAULT_UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// Mail server offered to clients that do not name one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailDefaults {
    pub host: String,
    pub port: u16,
}

impl Default for EmailDefaults {
    fn default() -> Self {
        Self {
            host: "imap.gmail.com".to_string(),
            port: 993,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub skip_processed_emails: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: SocketAddr,
    pub database: PathBuf,
    pub upload_limit: usize,
    pub log_format: LogFormat,
    pub email: EmailDefaults,
    pub ingest: IngestConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3001)),
            database: default_database_path(),
            upload_limit: DEFAULT_UPLOAD_LIMIT,
            log_format: LogFormat::default(),
            email: EmailDefaults::default(),
            ingest: IngestConfig::default(),
        }
    }
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "tally", "Tally")
        .map(|dirs| dirs.data_dir().join("receipts.db"))
        .unwrap_or_else(|| PathBuf::from("data").join("receipts.db"))
}

impl Config {
    /// Defaults, then the TOML file named by `TALLY_CONFIG`, then the
    /// process environment.
    pub fn load() -> Result<Config, ConfigError> {
        let file = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Some(read_file(Path::new(&path))?),
            Err(_) => None,
        };
        Config::from_sources(file.as_deref(), |key| std::env::var(key).ok())
    }

    pub fn from_sources<F>(file: Option<&str>, env: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match file {
            Some(text) => toml::from_str(text)?,
            None => Config::default(),
        };

        if let Some(v) = env("TALLY_BIND") {
            config.bind = parse("TALLY_BIND", &v)?;
        }
        if let Some(v) = env("TALLY_DATABASE") {
            config.database = PathBuf::from(v);
        }
        if let Some(v) = env("EMAIL_HOST") {
            config.email.host = v;
        }
        if let Some(v) = env("EMAIL_PORT") {
            config.email.port = parse("EMAIL_PORT", &v)?;
        }
        if let Some(v) = env("TALLY_UPLOAD_LIMIT") {
            config.upload_limit = parse("TALLY_UPLOAD_LIMIT", &v)?;
        }
        if let Some(v) = env("TALLY_LOG_FORMAT") {
            config.log_format = parse("TALLY_LOG_FORMAT", &v)?;
        }
        if let Some(v) = env("TALLY_SKIP_PROCESSED_EMAILS") {
            config.ingest.skip_processed_emails = parse("TALLY_SKIP_PROCESSED_EMAILS", &v)?;
        }

        Ok(config)
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}
