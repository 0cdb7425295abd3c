//! Store configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (`PostgreSQL` backend only)
//! - `SHOPKEEP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `SHOPKEEP_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `SHOPKEEP_DB_MIN_CONNECTIONS` - Idle connections kept open (default: 1)
//! - `SHOPKEEP_DB_ACQUIRE_TIMEOUT_SECS` - Pool acquire timeout (default: 10)
//! - `SHOPKEEP_TEXT_ENCODING` - Expected database text encoding (default: UTF8)
//! - `SHOPKEEP_COLLATION` - `case_insensitive` (default) or `binary`

use core::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Text encoding the store holds its text in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl TextEncoding {
    /// Name as reported by `SHOW server_encoding`.
    #[must_use]
    pub const fn as_pg_name(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF8",
            Self::Latin1 => "LATIN1",
        }
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "").as_str() {
            "UTF8" => Ok(Self::Utf8),
            "LATIN1" | "ISO88591" => Ok(Self::Latin1),
            _ => Err(format!("unsupported text encoding: {s}")),
        }
    }
}

/// How unique text keys (email, SKU, category name) compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Collation {
    /// `Jane@Example.com` and `jane@example.com` collide.
    #[default]
    CaseInsensitive,
    /// Byte-for-byte comparison.
    Binary,
}

impl Collation {
    /// Key under which a value is checked for uniqueness.
    #[must_use]
    pub fn unique_key(self, value: &str) -> String {
        match self {
            Self::CaseInsensitive => value.to_lowercase(),
            Self::Binary => value.to_owned(),
        }
    }
}

impl FromStr for Collation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "case_insensitive" | "ci" => Ok(Self::CaseInsensitive),
            "binary" => Ok(Self::Binary),
            _ => Err(format!("unsupported collation: {s}")),
        }
    }
}

/// Encoding and collation, fixed once when a store is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextSettings {
    pub encoding: TextEncoding,
    pub collation: Collation,
}

/// Store configuration.
#[derive(Clone)]
pub struct StoreConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Maximum pool size
    pub max_connections: u32,
    /// Minimum idle connections
    pub min_connections: u32,
    /// How long to wait for a pooled connection
    pub acquire_timeout: Duration,
    /// Encoding and collation
    pub text: TextSettings,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("text", &self.text)
            .finish()
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the database URL is missing or a numeric or
    /// enumerated variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SHOPKEEP_DATABASE_URL")?;
        let max_connections = parse_env_or_default("SHOPKEEP_DB_MAX_CONNECTIONS", 10)?;
        let min_connections = parse_env_or_default("SHOPKEEP_DB_MIN_CONNECTIONS", 1)?;
        let acquire_timeout =
            Duration::from_secs(parse_env_or_default("SHOPKEEP_DB_ACQUIRE_TIMEOUT_SECS", 10)?);

        if min_connections > max_connections {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPKEEP_DB_MIN_CONNECTIONS".to_owned(),
                format!("must not exceed SHOPKEEP_DB_MAX_CONNECTIONS ({max_connections})"),
            ));
        }

        Ok(Self {
            database_url,
            max_connections,
            min_connections,
            acquire_timeout,
            text: TextSettings::from_env()?,
        })
    }
}

impl TextSettings {
    /// Load encoding and collation from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for unknown values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            encoding: parse_env_or_default("SHOPKEEP_TEXT_ENCODING", TextEncoding::default())?,
            collation: parse_env_or_default("SHOPKEEP_COLLATION", Collation::default())?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_owned()))
}

/// Parse an environment variable, or use `default` when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    std::env::var(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_parse() {
        assert_eq!("utf-8".parse::<TextEncoding>(), Ok(TextEncoding::Utf8));
        assert_eq!("UTF8".parse::<TextEncoding>(), Ok(TextEncoding::Utf8));
        assert_eq!("latin1".parse::<TextEncoding>(), Ok(TextEncoding::Latin1));
        assert!("ebcdic".parse::<TextEncoding>().is_err());
    }

    #[test]
    fn test_collation_keys() {
        assert_eq!(Collation::CaseInsensitive.unique_key("A@B.com"), "a@b.com");
        assert_eq!(Collation::Binary.unique_key("A@B.com"), "A@B.com");
        assert_eq!("binary".parse::<Collation>(), Ok(Collation::Binary));
        assert!("fancy".parse::<Collation>().is_err());
    }

    #[test]
    fn test_defaults() {
        let text = TextSettings::default();
        assert_eq!(text.encoding, TextEncoding::Utf8);
        assert_eq!(text.collation, Collation::CaseInsensitive);
    }

    #[test]
    fn test_debug_redacts_url() {
        let config = StoreConfig {
            database_url: SecretString::from("postgres://user:hunter2@db/shop".to_owned()),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(3),
            text: TextSettings::default(),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
