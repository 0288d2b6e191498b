//! config-rs/lib.rs
//! Shared environment helpers used by every analyst crate.
//! Provides typed lookups with logged fallbacks so a malformed variable never
//! aborts startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Load a `.env` file from the working directory if one exists.
///
/// Returns true when a file was found and applied.
pub fn load_dotenv() -> bool {
    match dotenv::dotenv() {
        Ok(path) => {
            log::debug!("Loaded environment from {}", path.display());
            true
        }
        Err(_) => false,
    }
}

/// Get a typed value from the environment with proper fallback
///
/// # Arguments
/// * `var_name` - The environment variable to read
/// * `default` - The value to use when the variable is unset or unparsable
///
/// # Returns
/// The parsed value, or `default`
pub fn get_env_var<T: FromStr>(var_name: &str, default: T) -> T {
    match env::var(var_name) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            log::warn!("Invalid value in {}, using default", var_name);
            default
        }),
        Err(_) => default,
    }
}

/// Get an optional string from the environment, treating empty values as unset.
pub fn get_env_string(var_name: &str) -> Option<String> {
    env::var(var_name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse a truthy/falsy string ("1", "true", "yes", "on" and their negatives).
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get a boolean flag from the environment
///
/// Unrecognized values are logged and replaced by `default`.
pub fn get_env_bool(var_name: &str, default: bool) -> bool {
    match env::var(var_name) {
        Ok(raw) => parse_bool(&raw).unwrap_or_else(|| {
            log::warn!("Invalid boolean in {}, using default {}", var_name, default);
            default
        }),
        Err(_) => default,
    }
}

/// Resolve a variable under a prefix, falling back to the unprefixed name.
///
/// `get_prefixed_string("OFFLINE", "LLM_MODEL")` reads `OFFLINE_LLM_MODEL`
/// first and then `LLM_MODEL`.
pub fn get_prefixed_string(prefix: &str, var_name: &str) -> Option<String> {
    if !prefix.is_empty() {
        let prefixed = format!("{}_{}", prefix.to_uppercase(), var_name);
        if let Some(value) = get_env_string(&prefixed) {
            return Some(value);
        }
    }
    get_env_string(var_name)
}

/// Get the data directory used for file-backed stores
///
/// # Arguments
/// * `var_name` - The environment variable holding an override
/// * `default_dir` - Relative or absolute default directory
pub fn get_data_dir(var_name: &str, default_dir: &str) -> PathBuf {
    get_env_string(var_name)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_var() {
        // Test with environment variable
        std::env::set_var("CONFIG_RS_TEST_TIMEOUT", "45");
        assert_eq!(get_env_var("CONFIG_RS_TEST_TIMEOUT", 30u64), 45);

        // Test with garbage
        std::env::set_var("CONFIG_RS_TEST_TIMEOUT", "forty");
        assert_eq!(get_env_var("CONFIG_RS_TEST_TIMEOUT", 30u64), 30);

        // Test with default
        std::env::remove_var("CONFIG_RS_TEST_MISSING");
        assert_eq!(get_env_var("CONFIG_RS_TEST_MISSING", 7usize), 7);
    }

    #[test]
    fn test_parse_bool() {
        for truthy in ["1", "true", "YES", " on "] {
            assert_eq!(parse_bool(truthy), Some(true));
        }
        for falsy in ["0", "False", "no", "off"] {
            assert_eq!(parse_bool(falsy), Some(false));
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_get_env_bool() {
        std::env::set_var("CONFIG_RS_TEST_FLAG", "yes");
        assert!(get_env_bool("CONFIG_RS_TEST_FLAG", false));

        std::env::set_var("CONFIG_RS_TEST_FLAG", "sometimes");
        assert!(!get_env_bool("CONFIG_RS_TEST_FLAG", false));

        std::env::remove_var("CONFIG_RS_TEST_FLAG");
        assert!(get_env_bool("CONFIG_RS_TEST_FLAG", true));
    }

    #[test]
    fn test_get_prefixed_string() {
        std::env::set_var("CONFIG_RS_PREFIX_MODEL", "base-model");
        assert_eq!(get_prefixed_string("OFFLINE", "CONFIG_RS_PREFIX_MODEL"), Some("base-model".to_string()));

        std::env::set_var("OFFLINE_CONFIG_RS_PREFIX_MODEL", "local-model");
        assert_eq!(get_prefixed_string("offline", "CONFIG_RS_PREFIX_MODEL"), Some("local-model".to_string()));

        std::env::set_var("CONFIG_RS_PREFIX_EMPTY", "   ");
        assert_eq!(get_prefixed_string("", "CONFIG_RS_PREFIX_EMPTY"), None);
    }

    #[test]
    fn test_get_data_dir() {
        std::env::remove_var("CONFIG_RS_TEST_DATA_DIR");
        assert_eq!(get_data_dir("CONFIG_RS_TEST_DATA_DIR", "./data"), PathBuf::from("./data"));

        std::env::set_var("CONFIG_RS_TEST_DATA_DIR", "/var/lib/analyst");
        assert_eq!(get_data_dir("CONFIG_RS_TEST_DATA_DIR", "./data"), PathBuf::from("/var/lib/analyst"));
    }
}
