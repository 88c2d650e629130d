use std::{env, str::FromStr};

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Reads a boolean flag from the environment variable `name`.
pub fn env_flag(name: &str, default: bool) -> bool {
    parse_boolean_flag(env::var(name).ok(), default)
}

/// Reads and parses the environment variable `name`.
///
/// Returns `Ok(None)` if the variable is not set, and `Err` with the raw value if it could not be parsed, so that the
/// caller can decide how loudly to complain about it.
pub fn env_value<T: FromStr>(name: &str) -> Result<Option<T>, String> {
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().map(Some).map_err(|_| s),
        Err(_) => Ok(None),
    }
}
