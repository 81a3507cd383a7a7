//! Mapping from a chaos level to oscillator-bank parameters.

/// Complete parameter snapshot for one render block
///
/// Always constructed whole by [`derive_parameters`] and handed to the audio
/// side by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisParameters {
    /// Left carrier frequency (Hz)
    pub base_freq: f32,
    /// Right carrier offset (Hz); the binaural beat rate
    pub binaural_diff: f32,
    /// Output gain [0, 1]
    pub amplitude: f32,
    /// Tremolo rate (Hz)
    pub lfo_rate: f32,
    /// Tremolo depth (peaks at chaos 0.5)
    pub lfo_depth: f32,
    /// FM intensity
    pub fm_amount: f32,
    /// Gaussian noise level
    pub noise_amount: f32,
    /// Grain density (informational; gating uses fixed 20ms grains)
    pub grain_rate: f32,
    /// Grain size (ms, informational)
    pub grain_size: f32,
    /// Chaos level the snapshot was derived from [0, 1]
    pub chaos_level: f32,
    /// Stereo position [-1, 1]
    pub pan: f32,
}

impl Default for SynthesisParameters {
    fn default() -> Self {
        derive_parameters(0.0, 0.0)
    }
}

fn sanitize(value: f32, min: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        0.0
    }
}

/// Derive synthesis parameters from a chaos level and pan position
///
/// Pure: identical inputs give bit-identical outputs. Out-of-range inputs
/// are clamped; non-finite inputs are treated as 0.
pub fn derive_parameters(chaos: f32, pan: f32) -> SynthesisParameters {
    let chaos = sanitize(chaos, 0.0, 1.0);
    let pan = sanitize(pan, -1.0, 1.0);

    SynthesisParameters {
        base_freq: 100.0 + chaos * 700.0,
        binaural_diff: 5.0 - chaos * 4.5,
        amplitude: 0.3 + chaos * 0.4,
        lfo_rate: chaos * 12.0,
        lfo_depth: 4.0 * chaos * (1.0 - chaos),
        fm_amount: chaos.powi(2) * 1000.0,
        noise_amount: ((chaos - 0.5) * 2.0).max(0.0).powf(1.5),
        grain_rate: chaos * 100.0,
        grain_size: 200.0 - chaos * 180.0,
        chaos_level: chaos,
        pan,
    }
}

/// Map a horizontal position to a pan value in [-1, 1]
///
/// Left edge → -1, centre → 0, right edge → 1. A zero or non-finite width
/// gives the centre.
pub fn map_position_to_pan(x: f32, width: f32) -> f32 {
    if width.is_finite() && width > 0.0 {
        sanitize(2.0 * x / width - 1.0, -1.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_still_parameters() {
        let p = derive_parameters(0.0, 0.0);
        assert_eq!(p.base_freq, 100.0);
        assert_eq!(p.binaural_diff, 5.0);
        assert_eq!(p.amplitude, 0.3);
        assert_eq!(p.lfo_rate, 0.0);
        assert_eq!(p.lfo_depth, 0.0);
        assert_eq!(p.fm_amount, 0.0);
        assert_eq!(p.noise_amount, 0.0);
        assert_eq!(p.grain_size, 200.0);
        assert_eq!(p, SynthesisParameters::default());
    }

    #[test]
    fn test_full_chaos_parameters() {
        let p = derive_parameters(1.0, 0.0);
        assert!((p.base_freq - 800.0).abs() < 1e-4);
        assert!((p.binaural_diff - 0.5).abs() < 1e-6);
        assert!((p.amplitude - 0.7).abs() < 1e-6);
        assert!((p.lfo_rate - 12.0).abs() < 1e-6);
        assert_eq!(p.lfo_depth, 0.0);
        assert!((p.fm_amount - 1000.0).abs() < 1e-3);
        assert!((p.noise_amount - 1.0).abs() < 1e-6);
        assert!((p.grain_size - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_lfo_depth_peaks_at_half() {
        let p = derive_parameters(0.5, 0.0);
        assert!((p.lfo_depth - 1.0).abs() < 1e-6);
        assert_eq!(p.noise_amount, 0.0);
    }

    #[test]
    fn test_derivation_is_pure() {
        for i in 0..=100 {
            let chaos = i as f32 / 100.0;
            let a = derive_parameters(chaos, 0.3);
            let b = derive_parameters(chaos, 0.3);
            assert_eq!(a.base_freq.to_bits(), b.base_freq.to_bits());
            assert_eq!(a.noise_amount.to_bits(), b.noise_amount.to_bits());
            assert_eq!(a.fm_amount.to_bits(), b.fm_amount.to_bits());
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_malformed_inputs_are_clamped() {
        let p = derive_parameters(f32::NAN, f32::INFINITY);
        assert_eq!(p.chaos_level, 0.0);
        assert_eq!(p.pan, 0.0);

        let p = derive_parameters(7.0, -3.0);
        assert_eq!(p.chaos_level, 1.0);
        assert_eq!(p.pan, -1.0);
    }

    #[test]
    fn test_map_position_to_pan() {
        assert_eq!(map_position_to_pan(0.0, 320.0), -1.0);
        assert_eq!(map_position_to_pan(160.0, 320.0), 0.0);
        assert_eq!(map_position_to_pan(320.0, 320.0), 1.0);
        assert_eq!(map_position_to_pan(999.0, 320.0), 1.0);
        assert_eq!(map_position_to_pan(10.0, 0.0), 0.0);
    }
}
