//! Motion analysis configuration (processing resolution, flow, classification).

use super::checks::{positive, positive_count, unit_interval};
use crate::error::{ConfigError, ConfigResult};

/// Largest processing width or height (pixels)
pub const MAX_PROCESSING_SIDE: u32 = 4096;

/// Motion analysis parameters
#[derive(Debug, Clone)]
pub struct MotionConfig {
    /// Processing width (pixels); frames are resized to this before analysis
    pub width: u32,

    /// Processing height (pixels)
    pub height: u32,

    /// Gaussian blur sigma applied after grayscale conversion
    /// 1.1 ≈ a 5x5 kernel
    pub blur_sigma: f32,

    /// Classification threshold (dimensionless, [0, 1])
    pub threshold: f32,

    /// Fraction of `threshold` below which motion counts as still
    pub still_ratio: f32,

    /// Absolute grayscale difference that marks a pixel as moving (0-255)
    pub diff_threshold: u8,

    /// Mean flow magnitude (pixels/frame) that maps to energy 1.0
    pub energy_scale: f32,

    /// Centre displacement (pixels/frame) that maps to velocity 1.0
    pub velocity_scale: f32,

    /// Motion-energy history length (frames, 30 ≈ 1s at 30fps)
    pub history_len: usize,

    /// Optical flow pyramid depth
    pub flow_levels: usize,

    /// Optical flow window radius (7 = 15x15 window)
    pub flow_window_radius: usize,

    /// Lucas-Kanade refinement iterations per pyramid level
    pub flow_iterations: usize,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            blur_sigma: 1.1,
            threshold: 0.3,
            still_ratio: 0.5,
            diff_threshold: 25,
            energy_scale: 5.0,
            velocity_scale: 50.0,
            history_len: 30,
            flow_levels: 3,
            flow_window_radius: 7,
            flow_iterations: 3,
        }
    }
}

impl MotionConfig {
    /// Energy below which a frame is classified as still
    pub fn still_cutoff(&self) -> f32 {
        self.threshold * self.still_ratio
    }

    /// Geometric centre of the processing frame
    pub fn frame_center(&self) -> (f32, f32) {
        ((self.width / 2) as f32, (self.height / 2) as f32)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::NotPositive {
                name: "processing resolution",
                value: 0.0,
            });
        }
        for (name, side) in [("width", self.width), ("height", self.height)] {
            if side > MAX_PROCESSING_SIDE {
                return Err(ConfigError::OutOfRange {
                    name,
                    value: side as f64,
                    min: 1.0,
                    max: MAX_PROCESSING_SIDE as f64,
                });
            }
        }
        unit_interval("threshold", self.threshold)?;
        unit_interval("still_ratio", self.still_ratio)?;
        positive("blur_sigma", self.blur_sigma)?;
        positive("energy_scale", self.energy_scale)?;
        positive("velocity_scale", self.velocity_scale)?;
        positive_count("history_len", self.history_len)?;
        positive_count("flow_levels", self.flow_levels)?;
        positive_count("flow_window_radius", self.flow_window_radius)?;
        positive_count("flow_iterations", self.flow_iterations)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_still_cutoff() {
        let config = MotionConfig::default();
        assert!((config.still_cutoff() - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_threshold_outside_unit_interval() {
        let config = MotionConfig {
            threshold: 1.5,
            ..MotionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                name: "threshold",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_zero_resolution() {
        let config = MotionConfig {
            width: 0,
            ..MotionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_resolution() {
        let config = MotionConfig {
            width: 70_000,
            height: 70_000,
            ..MotionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { name: "width", .. })
        ));

        let config = MotionConfig {
            width: MAX_PROCESSING_SIDE,
            height: MAX_PROCESSING_SIDE,
            ..MotionConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
