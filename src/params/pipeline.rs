//! Combined configuration for the full motion-to-sound pipeline.

use super::{AudioConfig, ChaosConfig, MotionConfig};
use crate::error::ConfigResult;

/// Every stage's configuration in one place
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub motion: MotionConfig,
    pub chaos: ChaosConfig,
    pub audio: AudioConfig,

    /// Control loop rate (frames per second)
    pub frame_rate: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            motion: MotionConfig::default(),
            chaos: ChaosConfig::default(),
            audio: AudioConfig::default(),
            frame_rate: 30.0,
        }
    }
}

impl PipelineConfig {
    /// Default configuration at the given control rate
    pub fn with_frame_rate(frame_rate: f32) -> Self {
        Self {
            frame_rate,
            ..Self::default()
        }
    }

    /// Validate every stage
    pub fn validate(&self) -> ConfigResult<()> {
        self.motion.validate()?;
        self.chaos.validate()?;
        self.audio.validate()?;
        super::checks::positive("frame_rate", self.frame_rate)?;
        Ok(())
    }
}
