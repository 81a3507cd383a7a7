//! Shared range checks used by the `validate()` methods.

use crate::error::{ConfigError, ConfigResult};

pub(crate) fn finite(name: &'static str, value: f32) -> ConfigResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite {
            name,
            value: value as f64,
        })
    }
}

pub(crate) fn positive(name: &'static str, value: f32) -> ConfigResult<()> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive {
            name,
            value: value as f64,
        })
    }
}

pub(crate) fn positive_count(name: &'static str, value: usize) -> ConfigResult<()> {
    if value > 0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value: 0.0 })
    }
}

pub(crate) fn unit_interval(name: &'static str, value: f32) -> ConfigResult<()> {
    finite(name, value)?;
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value: value as f64,
            min: 0.0,
            max: 1.0,
        })
    }
}
