//! Typed environment variable readers
//!
//! Blank values are treated the same as unset ones, so `DB_PASSWORD=` in a
//! `.env` file counts as missing.

use std::str::FromStr;
use thiserror::Error;

/// Environment lookup errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EnvError {
    #[error("{key} is not set")]
    Missing { key: String },

    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Read a variable, returning `None` when unset or blank
pub fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a variable that must be present
pub fn required(key: &str) -> Result<String, EnvError> {
    optional(key).ok_or_else(|| EnvError::Missing {
        key: key.to_string(),
    })
}

/// Read a variable or fall back to `default`
pub fn string_or(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| default.to_string())
}

/// Parse a variable into `T`, using `default` when unset.
///
/// Unlike a silent fallback, a present but unparsable value is an error.
pub fn parse_or<T>(key: &str, default: T) -> Result<T, EnvError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| EnvError::Invalid {
            key: key.to_string(),
            value: raw,
            reason: e.to_string(),
        }),
    }
}
