// mqscope-config/src/validation.rs
//! Custom validation functions for configuration.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    static ref INTERFACE_NAME: Regex =
        Regex::new("^[a-zA-Z0-9_.:-]+$").expect("interface name pattern is valid");
}

/// Validate that an interface name follows Linux naming conventions.
///
/// `any` is accepted as the capture-all pseudo interface.
pub fn validate_interface(name: &str) -> Result<(), ValidationError> {
    if name == "any" {
        return Ok(());
    }

    let valid = !name.is_empty() && name.len() <= 15 && INTERFACE_NAME.is_match(name);
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_interface"))
    }
}

/// Validate a tracing filter directive such as `info` or `mqscope_engine=debug,warn`.
pub fn validate_log_filter(filter: &str) -> Result<(), ValidationError> {
    let valid = !filter.trim().is_empty()
        && filter
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-=,:[]{}.".contains(c));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_filter"))
    }
}
