//! FFT band summary of a mono signal.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::ConfigResult;
use crate::params::SpectrumConfig;

/// Mean FFT magnitude per frequency band
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpectrumBands {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

/// Reusable FFT plan and buffers
pub struct SpectrumAnalyzer {
    config: SpectrumConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new(config: SpectrumConfig) -> ConfigResult<Self> {
        config.validate()?;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let window = (0..config.fft_size)
            .map(|i| hann_window(i, config.fft_size))
            .collect();
        let buffer = vec![Complex::new(0.0, 0.0); config.fft_size];

        Ok(Self {
            config,
            fft,
            window,
            buffer,
        })
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    /// Analyze the first `fft_size` samples (zero padded when shorter)
    pub fn analyze(&mut self, samples: &[f32]) -> SpectrumBands {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        SpectrumBands {
            low: self.band_mean(self.config.bass_bins()),
            mid: self.band_mean(self.config.mid_bins()),
            high: self.band_mean(self.config.high_bins()),
        }
    }

    fn band_mean(&self, bins: std::ops::Range<usize>) -> f32 {
        if bins.is_empty() {
            return 0.0;
        }
        let len = bins.len() as f32;
        self.buffer[bins].iter().map(|c| c.norm()).sum::<f32>() / len
    }
}

/// Hann window function for FFT analysis
fn hann_window(index: usize, size: usize) -> f32 {
    if size < 2 {
        return 1.0;
    }
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}
