//! Chaos state: smooths motion metrics into a bounded scalar with decay.
//!
//! Motion raises a raw target (capped per motion type), the current value
//! eases toward it (slowly when still, quickly when moving), and stillness
//! additionally decays the value exponentially in wall-clock time.

mod parameters;

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use crate::error::ConfigResult;
use crate::motion::{unit, MotionMetrics, MotionType};
use crate::params::ChaosConfig;

pub use parameters::{derive_parameters, map_position_to_pan, SynthesisParameters};

/// Descriptive band of a chaos level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaosBand {
    Still,
    Gentle,
    Active,
    High,
}

impl ChaosBand {
    pub fn from_level(chaos: f32) -> Self {
        if chaos < 0.2 {
            ChaosBand::Still
        } else if chaos < 0.5 {
            ChaosBand::Gentle
        } else if chaos < 0.8 {
            ChaosBand::Active
        } else {
            ChaosBand::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChaosBand::Still => "Still (Ethereal Drone)",
            ChaosBand::Gentle => "Gentle Motion (Ripple)",
            ChaosBand::Active => "Active Motion (Rising Tension)",
            ChaosBand::High => "High Chaos (Scatter/Shatter)",
        }
    }
}

impl fmt::Display for ChaosBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Read-only view of the chaos state
#[derive(Debug, Clone, PartialEq)]
pub struct ChaosReport {
    pub chaos_score: f32,
    pub target_chaos: f32,
    pub motion_type: MotionType,
    pub band: ChaosBand,
    /// Recent chaos values, oldest first
    pub history: Vec<f32>,
}

/// Chaos state machine
pub struct ChaosStateMachine {
    config: ChaosConfig,
    current: f32,
    target: f32,
    motion_type: MotionType,
    last_update: Instant,
    history: VecDeque<f32>,
}

impl ChaosStateMachine {
    /// Create a state machine whose decay clock starts now
    pub fn new(config: ChaosConfig) -> ConfigResult<Self> {
        Self::new_at(config, Instant::now())
    }

    /// Create a state machine whose decay clock starts at `now`
    pub fn new_at(config: ChaosConfig, now: Instant) -> ConfigResult<Self> {
        config.validate()?;
        let history = VecDeque::with_capacity(config.history_len);
        Ok(Self {
            config,
            current: 0.0,
            target: 0.0,
            motion_type: MotionType::Still,
            last_update: now,
            history,
        })
    }

    /// Current chaos level [0, 1]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Unsmoothed target for a set of metrics (inputs clamped first)
    pub fn raw_target(&self, metrics: &MotionMetrics) -> f32 {
        let energy = unit(metrics.motion_energy);
        let velocity = unit(metrics.global_velocity);
        let local_weight = self.config.local_weight;

        match metrics.motion_type {
            MotionType::Still => 0.0,
            MotionType::Local => {
                let raw = energy * local_weight + velocity * (1.0 - local_weight);
                (raw * 0.8).clamp(0.3, 0.7)
            }
            MotionType::Global => {
                let raw = energy * local_weight + velocity * self.config.global_weight * 1.5;
                (raw * 1.2).clamp(0.5, 1.0)
            }
        }
    }

    /// Advance the state with new metrics observed at `now`
    ///
    /// Returns the new chaos level, always within [0, 1].
    pub fn update(&mut self, metrics: &MotionMetrics, now: Instant) -> f32 {
        let target = self.raw_target(metrics);
        let still = metrics.motion_type == MotionType::Still;

        let alpha = if still {
            self.config.still_alpha
        } else {
            self.config.motion_alpha
        };
        let mut next = alpha * target + (1.0 - alpha) * self.current;

        if still {
            // Instants never go backwards, but a caller-supplied `now` might
            let dt = now.saturating_duration_since(self.last_update).as_secs_f32();
            next *= (-dt / self.config.decay_time_s).exp();
        }

        self.current = unit(next);
        self.target = target;
        self.motion_type = metrics.motion_type;
        self.last_update = now;

        if self.history.len() == self.config.history_len {
            self.history.pop_front();
        }
        self.history.push_back(self.current);

        self.current
    }

    /// Parameters for the current chaos level
    pub fn parameters(&self, pan: f32) -> SynthesisParameters {
        derive_parameters(self.current, pan)
    }

    pub fn report(&self) -> ChaosReport {
        ChaosReport {
            chaos_score: self.current,
            target_chaos: self.target,
            motion_type: self.motion_type,
            band: ChaosBand::from_level(self.current),
            history: self.history.iter().copied().collect(),
        }
    }

    /// Return to silence, restarting the decay clock at `now`
    pub fn reset(&mut self, now: Instant) {
        self.current = 0.0;
        self.target = 0.0;
        self.motion_type = MotionType::Still;
        self.last_update = now;
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use std::time::Duration;

    fn metrics(motion_energy: f32, global_velocity: f32, motion_type: MotionType) -> MotionMetrics {
        MotionMetrics {
            motion_energy,
            global_velocity,
            center: Vec2::ZERO,
            motion_type,
        }
    }

    #[test]
    fn test_local_raw_target() {
        let machine = ChaosStateMachine::new(ChaosConfig::default()).unwrap();
        let raw = machine.raw_target(&metrics(0.5, 0.3, MotionType::Local));
        assert!((raw - 0.336).abs() < 1e-6);
    }

    #[test]
    fn test_raw_target_ranges() {
        let machine = ChaosStateMachine::new(ChaosConfig::default()).unwrap();
        assert_eq!(machine.raw_target(&metrics(1.0, 1.0, MotionType::Still)), 0.0);
        assert_eq!(machine.raw_target(&metrics(0.0, 0.0, MotionType::Local)), 0.3);
        assert_eq!(machine.raw_target(&metrics(1.0, 1.0, MotionType::Local)), 0.7);
        assert_eq!(machine.raw_target(&metrics(0.0, 0.0, MotionType::Global)), 0.5);
        assert_eq!(machine.raw_target(&metrics(1.0, 1.0, MotionType::Global)), 1.0);
    }

    #[test]
    fn test_still_decay_follows_law() {
        let config = ChaosConfig {
            decay_time_s: 1.0,
            ..ChaosConfig::default()
        };
        let start = Instant::now();
        let mut machine = ChaosStateMachine::new_at(config, start).unwrap();
        machine.current = 0.9;

        let step = 0.9 * (-0.2f32).exp();
        let mut expected = 0.9f32;
        let mut previous = 0.9f32;
        for n in 1..=5 {
            let now = start + Duration::from_millis(200 * n);
            let chaos = machine.update(&metrics(0.0, 0.0, MotionType::Still), now);
            expected *= step;

            assert!(chaos < previous);
            assert!((chaos - expected).abs() < 1e-5);
            // Never above the pure-decay curve
            assert!(chaos <= 0.9 * (-0.2 * n as f32).exp());
            previous = chaos;
        }
    }

    #[test]
    fn test_motion_ignores_elapsed_time() {
        let start = Instant::now();
        let mut machine = ChaosStateMachine::new_at(ChaosConfig::default(), start).unwrap();
        let chaos = machine.update(
            &metrics(0.5, 0.3, MotionType::Local),
            start + Duration::from_secs(60),
        );
        assert!((chaos - 0.4 * 0.336).abs() < 1e-6);
    }

    #[test]
    fn test_chaos_stays_bounded_for_malformed_metrics() {
        let start = Instant::now();
        let mut machine = ChaosStateMachine::new_at(ChaosConfig::default(), start).unwrap();
        let inputs = [
            metrics(f32::NAN, 0.2, MotionType::Global),
            metrics(f32::INFINITY, f32::NAN, MotionType::Local),
            metrics(-5.0, 9.0, MotionType::Global),
            metrics(f32::NEG_INFINITY, f32::INFINITY, MotionType::Still),
            metrics(100.0, 100.0, MotionType::Global),
        ];

        for (i, m) in inputs.iter().cycle().take(50).enumerate() {
            let chaos = machine.update(m, start + Duration::from_millis(33 * i as u64));
            assert!((0.0..=1.0).contains(&chaos));
        }
    }

    #[test]
    fn test_clock_going_backwards_does_not_grow_chaos() {
        let start = Instant::now() + Duration::from_secs(10);
        let mut machine = ChaosStateMachine::new_at(ChaosConfig::default(), start).unwrap();
        machine.current = 0.5;
        let chaos = machine.update(
            &metrics(0.0, 0.0, MotionType::Still),
            start - Duration::from_secs(5),
        );
        assert!((chaos - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_history_is_bounded_and_ordered() {
        let start = Instant::now();
        let mut machine = ChaosStateMachine::new_at(ChaosConfig::default(), start).unwrap();
        for i in 0..25u64 {
            machine.update(
                &metrics(1.0, 1.0, MotionType::Global),
                start + Duration::from_millis(i),
            );
        }
        let report = machine.report();
        assert_eq!(report.history.len(), 10);
        assert!(report.history.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(report.chaos_score, *report.history.last().unwrap());
        assert_eq!(report.motion_type, MotionType::Global);
        assert_eq!(report.band, ChaosBand::High);
    }

    #[test]
    fn test_reset() {
        let start = Instant::now();
        let mut machine = ChaosStateMachine::new_at(ChaosConfig::default(), start).unwrap();
        machine.update(&metrics(1.0, 1.0, MotionType::Global), start);
        machine.reset(start);

        let report = machine.report();
        assert_eq!(report.chaos_score, 0.0);
        assert!(report.history.is_empty());
        assert_eq!(report.band, ChaosBand::Still);
    }

    #[test]
    fn test_band_labels() {
        assert_eq!(ChaosBand::from_level(0.1).label(), "Still (Ethereal Drone)");
        assert_eq!(ChaosBand::from_level(0.2), ChaosBand::Gentle);
        assert_eq!(ChaosBand::from_level(0.5), ChaosBand::Active);
        assert_eq!(ChaosBand::from_level(0.8), ChaosBand::High);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ChaosConfig {
            decay_time_s: -1.0,
            ..ChaosConfig::default()
        };
        assert!(ChaosStateMachine::new(config).is_err());
    }
}
