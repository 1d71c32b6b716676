use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use paper_extraction::OracleConfig;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub upload_dir: PathBuf,
    pub figure_dir: PathBuf,
    /// URL path under which figure images are served.
    pub figure_url_prefix: String,
    /// Single allowed CORS origin; permissive when unset.
    pub cors_allowed_origin: Option<String>,
    pub max_upload_bytes: usize,
    pub oracle: OracleConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            upload_dir: PathBuf::from("uploads"),
            figure_dir: PathBuf::from("figures"),
            figure_url_prefix: "/figures".to_string(),
            cors_allowed_origin: None,
            max_upload_bytes: 50 * 1024 * 1024,
            oracle: OracleConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let api_key = lookup("GROQ_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("GROQ_API_KEY"))?;

        let oracle = OracleConfig {
            api_key,
            base_url: lookup("ORACLE_BASE_URL").unwrap_or(defaults.oracle.base_url),
            model: lookup("ORACLE_MODEL").unwrap_or(defaults.oracle.model),
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "ORACLE_TIMEOUT_SECS",
                defaults.oracle.timeout.as_secs(),
            )?),
            max_retries: parse_or(&lookup, "ORACLE_MAX_RETRIES", defaults.oracle.max_retries)?,
            ..defaults.oracle
        };

        Ok(Self {
            port: parse_or(&lookup, "PORT", defaults.port)?,
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            figure_dir: lookup("FIGURE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.figure_dir),
            figure_url_prefix: defaults.figure_url_prefix,
            cors_allowed_origin: lookup("CORS_ALLOWED_ORIGIN").filter(|o| !o.trim().is_empty()),
            max_upload_bytes: upload_limit(&lookup, defaults.max_upload_bytes)?,
            oracle,
        })
    }
}

const MEGABYTE: usize = 1024 * 1024;

fn upload_limit(
    lookup: &impl Fn(&str) -> Option<String>,
    default_bytes: usize,
) -> Result<usize, ConfigError> {
    let megabytes: usize = parse_or(lookup, "MAX_UPLOAD_MB", default_bytes / MEGABYTE)?;
    megabytes
        .checked_mul(MEGABYTE)
        .ok_or_else(|| ConfigError::Invalid {
            name: "MAX_UPLOAD_MB",
            value: megabytes.to_string(),
        })
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
