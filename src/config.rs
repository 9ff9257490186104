//! Application configuration parsed from environment variables.
//!
//! Optional:
//! - `PLOTCONTINUUM_DATA_DIR`: key-value store directory (platform data dir by default)
//! - `PLOTCONTINUUM_DOCUMENTS_DIR`: Markdown export directory
//! - `PLOTCONTINUUM_AUTOSAVE_SECS`: default 30
//! - `PLOTCONTINUUM_DRAFT_SECS`: default 3

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ErrorCode;
use crate::services::files::default_documents_dir;

pub const DEFAULT_AUTOSAVE_SECS: u64 = 30;
pub const DEFAULT_DRAFT_SECS: u64 = 3;
const APP_DIR: &str = "plotcontinuum";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot determine {0} directory; set {1}")]
    NoDirectory(&'static str, &'static str),
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        "E_CONFIG"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub documents_dir: PathBuf,
    pub autosave_interval: Duration,
    pub draft_interval: Duration,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoDirectory`] when a directory is neither set
    /// nor derivable from the platform.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = env_path("PLOTCONTINUUM_DATA_DIR")
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIR)))
            .ok_or(ConfigError::NoDirectory("data", "PLOTCONTINUUM_DATA_DIR"))?;
        let documents_dir = env_path("PLOTCONTINUUM_DOCUMENTS_DIR")
            .or_else(default_documents_dir)
            .ok_or(ConfigError::NoDirectory("documents", "PLOTCONTINUUM_DOCUMENTS_DIR"))?;
        let autosave_secs = env_parse("PLOTCONTINUUM_AUTOSAVE_SECS", DEFAULT_AUTOSAVE_SECS).max(1);
        let draft_secs = env_parse("PLOTCONTINUUM_DRAFT_SECS", DEFAULT_DRAFT_SECS).max(1);

        Ok(Self {
            data_dir,
            documents_dir,
            autosave_interval: Duration::from_secs(autosave_secs),
            draft_interval: Duration::from_secs(draft_secs),
        })
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
