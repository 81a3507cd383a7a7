//! Audio synthesis and spectrum analysis configuration.

use std::ops::Range;
use std::time::Duration;

use super::checks::{positive, positive_count};
use crate::error::{ConfigError, ConfigResult};

/// Audio render configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Output sample rate (Hz)
    pub sample_rate_hz: u32,

    /// Samples per render block (per channel)
    /// 2048 @ 44.1kHz ≈ 46ms, ~21 blocks per second
    pub block_size: usize,

    /// Granular gating grain length (milliseconds)
    pub grain_ms: f32,

    /// Seed for the noise and grain-gate generators
    pub seed: u64,

    /// Snapshots the parameter ring can hold before the render side drains it
    pub bus_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: audio_constants::DEFAULT_SAMPLE_RATE,
            block_size: audio_constants::DEFAULT_BLOCK_SIZE,
            grain_ms: 20.0,
            seed: 42,
            bus_capacity: 64,
        }
    }
}

impl AudioConfig {
    /// Sample rate as f32 for phase increments
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate_hz as f32
    }

    /// Wall-clock duration of one render block
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_size as f64 / self.sample_rate_hz as f64)
    }

    /// Grain length in samples (at least one sample)
    pub fn grain_len(&self) -> usize {
        let samples = self.grain_ms as f64 * self.sample_rate_hz as f64 / 1000.0;
        (samples.round() as usize).max(1)
    }

    /// Validate configuration (rates and sizes must be > 0)
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::NotPositive {
                name: "sample_rate_hz",
                value: 0.0,
            });
        }
        positive_count("block_size", self.block_size)?;
        positive("grain_ms", self.grain_ms)?;
        positive_count("bus_capacity", self.bus_capacity)?;
        Ok(())
    }
}

/// FFT analysis configuration with frequency band mappings
#[derive(Debug, Clone)]
pub struct SpectrumConfig {
    /// Sample rate of the analyzed signal (Hz)
    pub sample_rate_hz: usize,

    /// FFT window size (must be power of 2)
    pub fft_size: usize,

    /// Bass frequency range (Hz)
    pub bass_range_hz: (f32, f32),

    /// Mid frequency range (Hz)
    pub mid_range_hz: (f32, f32),

    /// High frequency range (Hz)
    pub high_range_hz: (f32, f32),
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: audio_constants::DEFAULT_SAMPLE_RATE as usize,
            fft_size: 2048,
            bass_range_hz: (20.0, 200.0),
            mid_range_hz: (200.0, 1000.0),
            high_range_hz: (1000.0, 4000.0),
        }
    }
}

impl SpectrumConfig {
    /// Spectrum configuration matching an audio configuration's sample rate
    pub fn for_audio(audio: &AudioConfig) -> Self {
        Self {
            sample_rate_hz: audio.sample_rate_hz as usize,
            ..Self::default()
        }
    }

    /// Convert frequency (Hz) to FFT bin index
    pub fn hz_to_bin(&self, hz: f32) -> usize {
        ((hz * self.fft_size as f32) / self.sample_rate_hz as f32) as usize
    }

    /// Get FFT bin range for bass frequencies
    pub fn bass_bins(&self) -> Range<usize> {
        self.band_bins(self.bass_range_hz)
    }

    /// Get FFT bin range for mid frequencies
    pub fn mid_bins(&self) -> Range<usize> {
        self.band_bins(self.mid_range_hz)
    }

    /// Get FFT bin range for high frequencies
    pub fn high_bins(&self) -> Range<usize> {
        self.band_bins(self.high_range_hz)
    }

    // Clamped to the positive-frequency half so short FFTs never index out of bounds
    fn band_bins(&self, (lo, hi): (f32, f32)) -> Range<usize> {
        let nyquist_bin = self.fft_size / 2;
        let start = self.hz_to_bin(lo).min(nyquist_bin);
        let end = self.hz_to_bin(hi).clamp(start, nyquist_bin);
        start..end
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.fft_size.is_power_of_two() {
            return Err(ConfigError::FftSize(self.fft_size));
        }
        positive_count("sample_rate_hz", self.sample_rate_hz)?;
        Ok(())
    }
}

/// Synthesis constants (fixed by the voice recurrence)
pub mod audio_constants {
    /// Default output sample rate (Hz)
    pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

    /// Default render block size (samples per channel)
    pub const DEFAULT_BLOCK_SIZE: usize = 2048;

    /// Modulation stages below this amount are bypassed
    pub const ACTIVATION_EPSILON: f32 = 0.01;

    /// Tremolo depth scale: lfo = sin(phase) * depth * 0.3 + 1
    pub const LFO_DEPTH_SCALE: f32 = 0.3;

    /// Modulator runs at this multiple of the base frequency
    pub const MODULATOR_RATIO: f32 = 2.0;

    /// FM index scale: modulator = sin(phase) * fm_amount * 0.01
    pub const FM_INDEX_SCALE: f32 = 0.01;

    /// Gaussian noise scale: noise * noise_amount * 0.3
    pub const NOISE_SCALE: f32 = 0.3;

    /// Granular gating engages above this chaos level
    pub const GRANULAR_CHAOS_THRESHOLD: f32 = 0.7;

    /// Gain applied to a ducked grain
    pub const GRAIN_DUCK_GAIN: f32 = 0.2;

    /// Peak level of a normalized waveform snapshot
    pub const SNAPSHOT_PEAK: f32 = 0.8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectrum_config_hz_to_bin() {
        let config = SpectrumConfig {
            fft_size: 1024,
            ..SpectrumConfig::default()
        };

        // At 44100 Hz sample rate and 1024 FFT size:
        // Bin resolution = 44100 / 1024 ≈ 43.07 Hz per bin
        assert_eq!(config.hz_to_bin(0.0), 0);
        assert_eq!(config.hz_to_bin(43.07), 1);
        assert_eq!(config.hz_to_bin(100.0), 2);
    }

    #[test]
    fn test_spectrum_config_band_ranges() {
        let config = SpectrumConfig::default();

        let bass = config.bass_bins();
        let mid = config.mid_bins();
        let high = config.high_bins();

        assert!(mid.start >= bass.end);
        assert!(high.start >= mid.end);
        assert!(high.end <= config.fft_size / 2);
    }

    #[test]
    fn test_spectrum_config_rejects_odd_fft_size() {
        let config = SpectrumConfig {
            fft_size: 1000,
            ..SpectrumConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::FftSize(1000)));
    }

    #[test]
    fn test_audio_config_validation() {
        assert!(AudioConfig::default().validate().is_ok());

        let zero_rate = AudioConfig {
            sample_rate_hz: 0,
            ..AudioConfig::default()
        };
        assert!(zero_rate.validate().is_err());

        let zero_block = AudioConfig {
            block_size: 0,
            ..AudioConfig::default()
        };
        assert!(zero_block.validate().is_err());
    }

    #[test]
    fn test_grain_len_is_twenty_ms() {
        let config = AudioConfig::default();
        assert_eq!(config.grain_len(), 882);
    }
}
