//! Parameter validation helpers used by the convenience methods.
//!
//! All checks raise [`Error::Parameter`] naming the offending parameter, so
//! bad input never reaches the encoder or the network.

use crate::error::{Error, Result};

/// The string must not be empty.
pub fn non_empty(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::parameter(name, "must not be empty"));
    }
    Ok(())
}

/// The value must be one of `allowed`.
pub fn one_of(name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&value) {
        return Err(Error::parameter(
            name,
            format!(
                "value is \"{value}\" which is not among the allowed values ({})",
                allowed.join(",")
            ),
        ));
    }
    Ok(())
}

/// The value must lie within `min..=max`.
pub fn in_range(name: &str, value: u32, min: u32, max: u32) -> Result<()> {
    if value < min {
        return Err(Error::parameter(
            name,
            format!("is below the allowed minimum of {min}"),
        ));
    }
    if value > max {
        return Err(Error::parameter(
            name,
            format!("is above the allowed maximum of {max}"),
        ));
    }
    Ok(())
}
