//! Environment variable helpers shared by the crates' config loaders.

use std::str::FromStr;

use crate::error::CoreError;

/// Read `key` from the environment, falling back to `default` when unset.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and parse `key`, falling back to `default` when unset.
///
/// A set but unparsable value is an error rather than a silent default.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, CoreError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{key} has an invalid value: {raw:?}"))),
        Err(_) => Ok(default),
    }
}
