//! Process configuration loaded from the environment.
//!
//! # Responsibility
//! - Resolve the store connection string into a [`DbLocation`].
//! - Resolve logging level and optional log directory.
//!
//! # Invariants
//! - A `.env` file, when present, only fills variables not already set.
//! - Unknown connection string schemes are rejected, not guessed.

use crate::db::DbLocation;
use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DB_URI_VAR: &str = "PEOPLE_DB_URI";
pub const LOG_LEVEL_VAR: &str = "PEOPLE_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "PEOPLE_LOG_DIR";

const DEFAULT_DB_URI: &str = "sqlite::memory:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable is set but blank.
    Empty(&'static str),
    UnsupportedScheme(String),
    InvalidLogLevel(String),
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty(var) => write!(f, "`{var}` is set but empty"),
            Self::UnsupportedScheme(scheme) => write!(
                f,
                "unsupported connection scheme `{scheme}`; expected sqlite: or a file path"
            ),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
            Self::RelativeLogDir(path) => write!(
                f,
                "`{LOG_DIR_VAR}` must be an absolute path, got `{}`",
                path.display()
            ),
        }
    }
}

impl Error for ConfigError {}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_location: DbLocation,
    pub log_level: &'static str,
    /// Rolling log file directory; `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Loads `.env` (if any) and reads configuration from process env.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_uri = lookup(DB_URI_VAR).unwrap_or_else(|| DEFAULT_DB_URI.to_string());
        let db_location = parse_db_uri(&db_uri)?;

        let log_level = match lookup(LOG_LEVEL_VAR) {
            Some(value) => normalize_level(&value).map_err(ConfigError::InvalidLogLevel)?,
            None => default_log_level(),
        };

        let log_dir = match lookup(LOG_DIR_VAR) {
            Some(value) if value.trim().is_empty() => return Err(ConfigError::Empty(LOG_DIR_VAR)),
            Some(value) => {
                let path = PathBuf::from(value.trim());
                if !path.is_absolute() {
                    return Err(ConfigError::RelativeLogDir(path));
                }
                Some(path)
            }
            None => None,
        };

        Ok(Self {
            db_location,
            log_level,
            log_dir,
        })
    }
}

/// Resolves a store connection string.
///
/// Accepts `sqlite::memory:`, `:memory:`, `sqlite://<path>`, `sqlite:<path>`
/// and bare paths.
pub fn parse_db_uri(uri: &str) -> Result<DbLocation, ConfigError> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(ConfigError::Empty(DB_URI_VAR));
    }

    if matches!(uri, ":memory:" | "sqlite::memory:" | "sqlite://:memory:") {
        return Ok(DbLocation::Memory);
    }

    if let Some(rest) = uri
        .strip_prefix("sqlite://")
        .or_else(|| uri.strip_prefix("sqlite:"))
    {
        if rest.is_empty() {
            return Err(ConfigError::Empty(DB_URI_VAR));
        }
        return Ok(DbLocation::File(Path::new(rest).to_path_buf()));
    }

    if let Some((scheme, _)) = uri.split_once("://") {
        return Err(ConfigError::UnsupportedScheme(scheme.to_string()));
    }

    Ok(DbLocation::File(PathBuf::from(uri)))
}
