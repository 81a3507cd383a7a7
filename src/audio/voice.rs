//! Binaural oscillator voice: the per-sample synthesis recurrence.
//!
//! Two sine carriers (left at `base_freq`, right offset by `binaural_diff`)
//! with optional tremolo LFO, 2:1 FM, Gaussian noise, and granular gating,
//! followed by gain, constant-power pan, and a hard clip.

use std::f32::consts::{FRAC_1_SQRT_2, TAU};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::chaos::SynthesisParameters;
use crate::params::audio_constants::{
    ACTIVATION_EPSILON, FM_INDEX_SCALE, GRAIN_DUCK_GAIN, GRANULAR_CHAOS_THRESHOLD,
    LFO_DEPTH_SCALE, MODULATOR_RATIO, NOISE_SCALE,
};
use crate::params::AudioConfig;

/// Offset between the noise and grain-gate seeds (keeps the streams independent)
const GRAIN_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// Wrap a phase into [0, 2π); non-finite phases restart at 0
pub(crate) fn wrap_phase(phase: f32) -> f32 {
    if !phase.is_finite() {
        return 0.0;
    }
    let wrapped = phase.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Constant-power pan gains `(left, right)` for pan in [-1, 1]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let pan = if pan.is_finite() {
        pan.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let p = (pan + 1.0) / 2.0;
    ((1.0 - p).sqrt(), p.sqrt())
}

/// Oscillator phases (radians), persistent across blocks
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct PhaseAccumulators {
    pub left: f32,
    pub right: f32,
    pub lfo: f32,
    pub modulator: f32,
}

impl PhaseAccumulators {
    fn all_wrapped(&self) -> bool {
        [self.left, self.right, self.lfo, self.modulator]
            .iter()
            .all(|p| (0.0..TAU).contains(p))
    }
}

/// Per-grain coin flips for granular gating
///
/// A grain spans `grain_len` samples of the output stream regardless of how
/// the stream is split into render calls.
pub(crate) struct GrainGate {
    rng: StdRng,
    grain_len: usize,
    /// Samples left in the current grain (0 = draw a new one)
    remaining: usize,
    gain: f32,
}

impl GrainGate {
    pub fn new(seed: u64, grain_len: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed.wrapping_add(GRAIN_STREAM)),
            grain_len: grain_len.max(1),
            remaining: 0,
            gain: 1.0,
        }
    }

    /// Gain for the next grain (1.0 or the duck gain, 50/50)
    pub fn next_gain(&mut self) -> f32 {
        if self.rng.gen_bool(0.5) {
            GRAIN_DUCK_GAIN
        } else {
            1.0
        }
    }

    /// Scale the samples by their grain's gain, continuing the grain left
    /// open by the previous call
    pub fn apply(&mut self, left: &mut [f32], right: &mut [f32]) {
        let n = left.len().min(right.len());
        let mut pos = 0;
        while pos < n {
            if self.remaining == 0 {
                self.gain = self.next_gain();
                self.remaining = self.grain_len;
            }
            let end = n.min(pos + self.remaining);
            let gain = self.gain;
            left[pos..end].iter_mut().for_each(|s| *s *= gain);
            right[pos..end].iter_mut().for_each(|s| *s *= gain);
            self.remaining -= end - pos;
            pos = end;
        }
    }

    /// Close the open grain; the next `apply` starts a fresh one
    pub fn reset(&mut self) {
        self.remaining = 0;
    }
}

/// Stateful stereo voice
pub(crate) struct Voice {
    sample_rate: f32,
    phases: PhaseAccumulators,
    noise: StdRng,
    grains: GrainGate,
}

impl Voice {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            sample_rate: config.sample_rate(),
            phases: PhaseAccumulators::default(),
            noise: StdRng::seed_from_u64(config.seed),
            grains: GrainGate::new(config.seed, config.grain_len()),
        }
    }

    #[cfg(test)]
    pub fn phases(&self) -> PhaseAccumulators {
        self.phases
    }

    fn increment(&self, freq: f32) -> f32 {
        TAU * freq / self.sample_rate
    }

    /// Render one block into `left`/`right` (equal lengths)
    pub fn render(&mut self, params: &SynthesisParameters, left: &mut [f32], right: &mut [f32]) {
        let n = left.len().min(right.len());
        let (left, right) = (&mut left[..n], &mut right[..n]);

        let inc_left = self.increment(params.base_freq);
        let inc_right = self.increment(params.base_freq + params.binaural_diff);
        let inc_lfo = self.increment(params.lfo_rate);
        let inc_mod = self.increment(params.base_freq * MODULATOR_RATIO);

        let lfo_on = params.lfo_rate > ACTIVATION_EPSILON && params.lfo_depth > ACTIVATION_EPSILON;
        let fm_on = params.fm_amount > ACTIVATION_EPSILON;
        let noise_on = params.noise_amount > ACTIVATION_EPSILON;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let phases = &mut self.phases;
            phases.left = wrap_phase(phases.left + inc_left);
            phases.right = wrap_phase(phases.right + inc_right);

            let mut out_l = phases.left.sin();
            let mut out_r = phases.right.sin();

            if lfo_on {
                phases.lfo = wrap_phase(phases.lfo + inc_lfo);
                let lfo = phases.lfo.sin() * params.lfo_depth * LFO_DEPTH_SCALE + 1.0;
                out_l *= lfo;
                out_r *= lfo;
            }

            // FM replaces the tremolo value for this sample
            if fm_on {
                phases.modulator = wrap_phase(phases.modulator + inc_mod);
                let m = phases.modulator.sin() * params.fm_amount * FM_INDEX_SCALE;
                out_l = (phases.left + m).sin();
                out_r = (phases.right + m).sin();
            }

            if noise_on {
                let draw: f32 = self.noise.sample(StandardNormal);
                let draw = draw * params.noise_amount * NOISE_SCALE;
                out_l += draw;
                out_r += draw;
            }

            *l = out_l;
            *r = out_r;
        }

        if params.chaos_level > GRANULAR_CHAOS_THRESHOLD {
            self.grains.apply(left, right);
        } else {
            self.grains.reset();
        }

        let (gain_l, gain_r) = pan_gains(params.pan);
        let gain_l = gain_l * params.amplitude;
        let gain_r = gain_r * params.amplitude;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            *l = (*l * gain_l).clamp(-1.0, 1.0);
            *r = (*r * gain_r).clamp(-1.0, 1.0);
        }

        debug_assert!(self.phases.all_wrapped());
    }
}

/// Downmix to mono at equal power
pub(crate) fn downmix(left: &[f32], right: &[f32]) -> Vec<f32> {
    left.iter()
        .zip(right)
        .map(|(l, r)| (l + r) * FRAC_1_SQRT_2)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chaos::derive_parameters;

    fn pure_tone_params() -> SynthesisParameters {
        SynthesisParameters {
            lfo_rate: 0.0,
            lfo_depth: 0.0,
            fm_amount: 0.0,
            noise_amount: 0.0,
            pan: 0.4,
            ..derive_parameters(0.3, 0.0)
        }
    }

    #[test]
    fn test_pan_law_is_constant_power() {
        for i in -10..=10 {
            let (l, r) = pan_gains(i as f32 / 10.0);
            assert!((l * l + r * r - 1.0).abs() < 1e-6);
        }
        assert_eq!(pan_gains(-1.0), (1.0, 0.0));
        assert_eq!(pan_gains(1.0), (0.0, 1.0));
    }

    #[test]
    fn test_wrap_phase() {
        assert_eq!(wrap_phase(0.0), 0.0);
        assert!((wrap_phase(TAU + 0.5) - 0.5).abs() < 1e-5);
        assert!((0.0..TAU).contains(&wrap_phase(-1e-9)));
        assert_eq!(wrap_phase(f32::NAN), 0.0);
    }

    #[test]
    fn test_pure_tones_without_modulation() {
        let config = AudioConfig::default();
        let params = pure_tone_params();
        let mut voice = Voice::new(&config);
        let mut left = vec![0.0; 512];
        let mut right = vec![0.0; 512];
        voice.render(&params, &mut left, &mut right);

        let sr = config.sample_rate();
        let (gain_l, gain_r) = pan_gains(params.pan);
        let (mut pl, mut pr) = (0.0f32, 0.0f32);
        for i in 0..512 {
            pl = wrap_phase(pl + TAU * params.base_freq / sr);
            pr = wrap_phase(pr + TAU * (params.base_freq + params.binaural_diff) / sr);
            let expected_l = params.amplitude * gain_l * pl.sin();
            let expected_r = params.amplitude * gain_r * pr.sin();
            assert!((left[i] - expected_l).abs() < 1e-5);
            assert!((right[i] - expected_r).abs() < 1e-5);
        }
    }

    #[test]
    fn test_phases_stay_wrapped() {
        let mut voice = Voice::new(&AudioConfig::default());
        let mut left = vec![0.0; 2048];
        let mut right = vec![0.0; 2048];
        for i in 0..200 {
            let params = derive_parameters((i % 11) as f32 / 10.0, 0.0);
            voice.render(&params, &mut left, &mut right);
            assert!(voice.phases().all_wrapped());
        }
    }

    #[test]
    fn test_output_is_clipped() {
        let mut voice = Voice::new(&AudioConfig::default());
        let mut left = vec![0.0; 4096];
        let mut right = vec![0.0; 4096];
        let params = SynthesisParameters {
            amplitude: 1.0,
            noise_amount: 50.0,
            ..derive_parameters(1.0, 0.0)
        };
        voice.render(&params, &mut left, &mut right);
        assert!(left.iter().chain(&right).all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_grain_gains_are_reproducible() {
        let mut a = GrainGate::new(7, 882);
        let mut b = GrainGate::new(7, 882);
        let gains_a: Vec<f32> = (0..32).map(|_| a.next_gain()).collect();
        let gains_b: Vec<f32> = (0..32).map(|_| b.next_gain()).collect();

        assert_eq!(gains_a, gains_b);
        assert!(gains_a.iter().all(|&g| g == 1.0 || g == GRAIN_DUCK_GAIN));
        assert!(gains_a.contains(&1.0) && gains_a.contains(&GRAIN_DUCK_GAIN));
    }

    #[test]
    fn test_grain_gate_is_per_grain() {
        let mut gate = GrainGate::new(3, 4);
        let mut left = vec![1.0; 10];
        let mut right = vec![1.0; 10];
        gate.apply(&mut left, &mut right);

        for grain in left.chunks(4) {
            assert!(grain.iter().all(|&s| s == grain[0]));
        }
        assert_eq!(left, right);
    }

    #[test]
    fn test_grains_continue_across_calls() {
        let mut whole = GrainGate::new(11, 4);
        let mut expected = vec![1.0; 20];
        let mut expected_r = vec![1.0; 20];
        whole.apply(&mut expected, &mut expected_r);

        // Split at points that never line up with grain boundaries
        let mut split = GrainGate::new(11, 4);
        let mut left = vec![1.0; 20];
        let mut right = vec![1.0; 20];
        let mut start = 0;
        for len in [3, 3, 5, 2, 7] {
            let end = start + len;
            split.apply(&mut left[start..end], &mut right[start..end]);
            start = end;
        }

        assert_eq!(left, expected);
        for grain in left.chunks(4) {
            assert!(grain.iter().all(|&s| s == grain[0]));
        }
    }

    #[test]
    fn test_grain_reset_starts_fresh_grain() {
        let mut gate = GrainGate::new(5, 4);
        let mut left = vec![1.0; 2];
        let mut right = vec![1.0; 2];
        gate.apply(&mut left, &mut right);
        gate.reset();

        let mut reference = GrainGate::new(5, 4);
        let first = reference.next_gain();
        let second = reference.next_gain();
        assert_eq!(left, vec![first; 2]);

        let mut left = vec![1.0; 4];
        let mut right = vec![1.0; 4];
        gate.apply(&mut left, &mut right);
        assert_eq!(left, vec![second; 4]);
    }

    #[test]
    fn test_split_render_matches_single_render() {
        let config = AudioConfig::default();
        let params = SynthesisParameters {
            lfo_rate: 0.0,
            lfo_depth: 0.0,
            fm_amount: 0.0,
            noise_amount: 0.0,
            ..derive_parameters(0.8, 0.0)
        };

        let mut single = Voice::new(&config);
        let mut expected_l = vec![0.0; 2048];
        let mut expected_r = vec![0.0; 2048];
        single.render(&params, &mut expected_l, &mut expected_r);

        let mut split = Voice::new(&config);
        let mut left = vec![0.0; 2048];
        let mut right = vec![0.0; 2048];
        for (l, r) in left.chunks_mut(256).zip(right.chunks_mut(256)) {
            split.render(&params, l, r);
        }

        assert_eq!(left, expected_l);
        assert_eq!(right, expected_r);
    }

    #[test]
    fn test_high_chaos_render_is_reproducible() {
        let config = AudioConfig {
            seed: 1234,
            ..AudioConfig::default()
        };
        let params = derive_parameters(0.8, 0.0);
        let render = || {
            let mut voice = Voice::new(&config);
            let mut left = vec![0.0; 4096];
            let mut right = vec![0.0; 4096];
            voice.render(&params, &mut left, &mut right);
            (left, right)
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn test_downmix() {
        let mono = downmix(&[1.0, 0.5], &[1.0, -0.5]);
        assert!((mono[0] - 2.0 * FRAC_1_SQRT_2).abs() < 1e-6);
        assert_eq!(mono[1], 0.0);
    }
}
