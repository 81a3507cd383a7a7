//! Motion analysis: reduces consecutive video frames to motion metrics.
//!
//! Each frame is downscaled, converted to grayscale, and blurred. Against the
//! previous frame we compute:
//! - Dense optical flow (mean magnitude → motion energy)
//! - A thresholded frame difference (centroid → centre of motion)
//! - Centre displacement between calls (→ global velocity)
//!
//! and classify the frame as still, local (waving in place), or global
//! (walking across the view).

mod flow;
mod frame;

use std::collections::VecDeque;
use std::fmt;

use glam::Vec2;
use image::GrayImage;

use crate::error::ConfigResult;
use crate::params::MotionConfig;

pub use flow::{FlowEstimator, FlowField};
pub use frame::Frame;

/// Motion classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionType {
    /// No significant movement
    #[default]
    Still,
    /// High motion energy with little displacement (waving)
    Local,
    /// Motion with displacement (walking, running)
    Global,
}

impl fmt::Display for MotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MotionType::Still => "still",
            MotionType::Local => "local",
            MotionType::Global => "global",
        };
        f.write_str(name)
    }
}

/// Per-frame motion summary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionMetrics {
    /// Mean optical-flow magnitude, normalized to [0, 1]
    pub motion_energy: f32,
    /// Centre-of-motion displacement since the previous frame, normalized to [0, 1]
    pub global_velocity: f32,
    /// Centre of motion in processing-resolution pixels
    pub center: Vec2,
    pub motion_type: MotionType,
}

impl MotionMetrics {
    /// Metrics for a frame with no measurable motion
    pub fn still_at(center: Vec2) -> Self {
        Self {
            motion_energy: 0.0,
            global_velocity: 0.0,
            center,
            motion_type: MotionType::Still,
        }
    }
}

/// Summary of recent motion energy
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionStatistics {
    pub mean: f32,
    pub max: f32,
    pub min: f32,
    /// Population standard deviation
    pub std: f32,
}

/// Clamp to [0, 1], mapping NaN to 0
pub(crate) fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Stateful motion analyzer (keeps the previous frame and centre)
pub struct MotionAnalyzer {
    config: MotionConfig,
    flow: FlowEstimator,
    prev_gray: Option<GrayImage>,
    prev_center: Option<Vec2>,
    history: VecDeque<f32>,
}

impl MotionAnalyzer {
    /// Create an analyzer, rejecting invalid configuration
    pub fn new(config: MotionConfig) -> ConfigResult<Self> {
        config.validate()?;
        let flow = FlowEstimator::new(
            config.flow_levels,
            config.flow_window_radius,
            config.flow_iterations,
        );
        let history = VecDeque::with_capacity(config.history_len);
        Ok(Self {
            config,
            flow,
            prev_gray: None,
            prev_center: None,
            history,
        })
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Processing width (pixels)
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Processing height (pixels)
    pub fn height(&self) -> u32 {
        self.config.height
    }

    fn frame_center(&self) -> Vec2 {
        let (x, y) = self.config.frame_center();
        Vec2::new(x, y)
    }

    /// Analyze a frame against the previous one
    ///
    /// The first frame after construction or `reset()` has no reference, so
    /// it reports still motion at the frame centre.
    pub fn analyze(&mut self, frame: &Frame) -> MotionMetrics {
        let current = frame::preprocess(
            frame,
            self.config.width,
            self.config.height,
            self.config.blur_sigma,
        );

        let metrics = match self.prev_gray.as_ref() {
            Some(prev) => {
                let flow = self.flow.estimate(prev, &current);
                let motion_energy = unit(flow.mean_magnitude() / self.config.energy_scale);

                let center = frame::difference_centroid(prev, &current, self.config.diff_threshold)
                    .unwrap_or_else(|| self.frame_center());
                let global_velocity = self.velocity_to(center);
                let motion_type = self.classify(motion_energy, global_velocity);

                self.record_energy(motion_energy);
                self.prev_center = Some(center);

                MotionMetrics {
                    motion_energy,
                    global_velocity,
                    center,
                    motion_type,
                }
            }
            None => MotionMetrics::still_at(self.frame_center()),
        };

        self.prev_gray = Some(current);
        metrics
    }

    /// Normalized centre displacement from the previous call
    fn velocity_to(&self, center: Vec2) -> f32 {
        match self.prev_center {
            Some(prev) => unit(center.distance(prev) / self.config.velocity_scale),
            None => 0.0,
        }
    }

    /// Classify motion (first match wins)
    pub fn classify(&self, motion_energy: f32, global_velocity: f32) -> MotionType {
        let threshold = self.config.threshold;
        if motion_energy < self.config.still_cutoff() {
            MotionType::Still
        } else if global_velocity < threshold && motion_energy > threshold {
            MotionType::Local
        } else {
            MotionType::Global
        }
    }

    fn record_energy(&mut self, energy: f32) {
        if self.history.len() == self.config.history_len {
            self.history.pop_front();
        }
        self.history.push_back(energy);
    }

    /// Statistics over the recent motion-energy history
    pub fn statistics(&self) -> MotionStatistics {
        if self.history.is_empty() {
            return MotionStatistics::default();
        }

        let n = self.history.len() as f32;
        let mean = self.history.iter().sum::<f32>() / n;
        let max = self.history.iter().copied().fold(f32::MIN, f32::max);
        let min = self.history.iter().copied().fold(f32::MAX, f32::min);
        let variance = self.history.iter().map(|e| (e - mean).powi(2)).sum::<f32>() / n;

        MotionStatistics {
            mean,
            max,
            min,
            std: variance.sqrt(),
        }
    }

    /// Forget the previous frame, centre, and history
    pub fn reset(&mut self) {
        self.prev_gray = None;
        self.prev_center = None;
        self.history.clear();
    }
}
