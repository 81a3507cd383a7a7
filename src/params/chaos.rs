//! Chaos scoring configuration (weights, smoothing, decay).

use super::checks::{positive, positive_count, unit_interval};
use crate::error::ConfigResult;

/// Chaos state machine parameters
#[derive(Debug, Clone)]
pub struct ChaosConfig {
    /// Time constant (seconds) of the exponential decay back to stillness
    pub decay_time_s: f32,

    /// Weight of motion energy in local/global raw targets ([0, 1])
    pub local_weight: f32,

    /// Weight of centre velocity in the global raw target ([0, 1])
    pub global_weight: f32,

    /// Smoothing factor while still (slow settle)
    pub still_alpha: f32,

    /// Smoothing factor while moving (fast onset)
    pub motion_alpha: f32,

    /// Number of recent chaos values kept
    pub history_len: usize,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            decay_time_s: 2.5,
            local_weight: 0.6,
            global_weight: 0.4,
            still_alpha: 0.1,
            motion_alpha: 0.4,
            history_len: 10,
        }
    }
}

impl ChaosConfig {
    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        positive("decay_time_s", self.decay_time_s)?;
        unit_interval("local_weight", self.local_weight)?;
        unit_interval("global_weight", self.global_weight)?;
        unit_interval("still_alpha", self.still_alpha)?;
        unit_interval("motion_alpha", self.motion_alpha)?;
        positive_count("history_len", self.history_len)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_default_is_valid() {
        assert!(ChaosConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_decay() {
        let config = ChaosConfig {
            decay_time_s: 0.0,
            ..ChaosConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                name: "decay_time_s",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_nan_weight() {
        let config = ChaosConfig {
            global_weight: f32::NAN,
            ..ChaosConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotFinite { .. })
        ));
    }
}
