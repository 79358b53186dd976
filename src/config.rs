//! Engine configuration parsed from environment variables.

use std::env::VarError;
use std::path::PathBuf;

use crate::consts::{DEFAULT_DATA_DIR, DEFAULT_MAX_ROWS, DEFAULT_STORE_KEY, MAX_ROWS_LIMIT};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the file-backed store.
    pub data_dir: PathBuf,
    /// Store namespace key for the dashboard collection.
    pub store_key: String,
    /// Row ceiling for the placement search.
    pub max_rows: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            store_key: DEFAULT_STORE_KEY.to_owned(),
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

impl Config {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `BLOCKBOARD_DATA_DIR`: default `.blockboard`
    /// - `BLOCKBOARD_STORE_KEY`: default `blockboard-dashboards`
    /// - `BLOCKBOARD_MAX_ROWS`: integer in `1..=10000`, default 1000
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a value that is not valid
    /// Unicode, an empty store key, or a row ceiling outside its range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = env_string("BLOCKBOARD_DATA_DIR")?.map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);

        let store_key = env_string("BLOCKBOARD_STORE_KEY")?.unwrap_or_else(|| DEFAULT_STORE_KEY.to_owned());
        if store_key.trim().is_empty() {
            return Err(ConfigError::Invalid { var: "BLOCKBOARD_STORE_KEY", value: store_key });
        }

        let max_rows = parse_max_rows(env_string("BLOCKBOARD_MAX_ROWS")?.as_deref())?;

        Ok(Self { data_dir, store_key, max_rows })
    }
}

fn env_string(var: &'static str) -> Result<Option<String>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(raw)) => Err(ConfigError::Invalid { var, value: raw.to_string_lossy().into_owned() }),
    }
}

fn parse_max_rows(raw: Option<&str>) -> Result<u32, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_MAX_ROWS);
    };
    match raw.trim().parse::<u32>() {
        Ok(rows) if (1..=MAX_ROWS_LIMIT).contains(&rows) => Ok(rows),
        _ => Err(ConfigError::Invalid { var: "BLOCKBOARD_MAX_ROWS", value: raw.to_owned() }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
