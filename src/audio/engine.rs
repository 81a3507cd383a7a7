//! Synthesis engine: owns the parameter publisher, the shared renderer, and
//! the output sink.

use log::{info, warn};

use super::renderer::{Renderer, SharedRenderer};
use super::sink::{AudioSink, NullSink, OutputMode};
use super::voice::{downmix, Voice};
use crate::bus::{parameter_bus, ParameterPublisher};
use crate::chaos::SynthesisParameters;
use crate::error::{AudioResult, ConfigResult};
use crate::params::audio_constants::SNAPSHOT_PEAK;
use crate::params::AudioConfig;

/// Planar stereo samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl StereoBuffer {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// Engine status report
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub mode: OutputMode,
    pub is_running: bool,
    pub sample_rate: u32,
    pub block_size: usize,
    pub backend: String,
    /// Callbacks answered with silence because the renderer was busy
    pub dropouts: u64,
}

/// Real-time oscillator bank driven by published parameter snapshots
pub struct AudioSynthesisEngine {
    config: AudioConfig,
    publisher: ParameterPublisher,
    renderer: SharedRenderer,
    sink: Box<dyn AudioSink>,
    running: bool,
}

impl AudioSynthesisEngine {
    /// Create an engine that will output through `sink` once started
    pub fn new(config: AudioConfig, sink: Box<dyn AudioSink>) -> ConfigResult<Self> {
        config.validate()?;
        let (publisher, reader) =
            parameter_bus(SynthesisParameters::default(), config.bus_capacity);
        let renderer = SharedRenderer::new(Renderer::new(&config, reader));

        Ok(Self {
            config,
            publisher,
            renderer,
            sink,
            running: false,
        })
    }

    /// Engine rendering without output
    pub fn silent(config: AudioConfig) -> ConfigResult<Self> {
        let sink = Box::new(NullSink::new(&config));
        Self::new(config, sink)
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Hand a new parameter snapshot to the render path (never blocks)
    pub fn publish(&mut self, params: SynthesisParameters) {
        self.publisher.publish(params);
    }

    /// Last published snapshot
    pub fn parameters(&self) -> SynthesisParameters {
        self.publisher.latest()
    }

    /// Render `num_samples` stereo samples as one block
    ///
    /// Advances the live oscillator state. While a sink is running this
    /// competes with it for the renderer.
    pub fn render(&mut self, num_samples: usize) -> StereoBuffer {
        self.publisher.flush();
        let mut buffer = StereoBuffer {
            left: vec![0.0; num_samples],
            right: vec![0.0; num_samples],
        };
        self.renderer
            .lock()
            .render(&mut buffer.left, &mut buffer.right);
        buffer
    }

    /// Mono preview of the current sound for visualization
    ///
    /// Renders `duration_s` seconds of the latest snapshot (pan centred) on a
    /// fresh voice, so live phases and generators are untouched. Normalized
    /// to a 0.8 peak unless silent.
    pub fn snapshot_waveform(&self, duration_s: f32) -> Vec<f32> {
        let seconds = if duration_s.is_finite() {
            duration_s.max(0.0)
        } else {
            0.0
        };
        let num_samples = (seconds as f64 * self.config.sample_rate_hz as f64).floor() as usize;

        let params = SynthesisParameters {
            pan: 0.0,
            ..self.publisher.latest()
        };
        let mut voice = Voice::new(&self.config);
        let mut left = vec![0.0; num_samples];
        let mut right = vec![0.0; num_samples];
        voice.render(&params, &mut left, &mut right);

        let mut mono = downmix(&left, &right);
        let peak = mono.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        if peak > 0.0 {
            let gain = SNAPSHOT_PEAK / peak;
            mono.iter_mut().for_each(|s| *s *= gain);
        }
        mono
    }

    /// Start the sink (no-op when already running)
    pub fn start(&mut self) -> AudioResult<()> {
        if self.running {
            return Ok(());
        }
        self.sink.start(self.renderer.clone())?;
        self.running = true;
        info!(
            "Audio engine started: {} via {} @ {}Hz, block {}",
            self.sink.mode(),
            self.sink.backend(),
            self.config.sample_rate_hz,
            self.config.block_size
        );
        Ok(())
    }

    /// Start the sink, falling back to silent rendering if it fails
    pub fn start_or_silent(&mut self) -> OutputMode {
        match self.start() {
            Ok(()) => self.sink.mode(),
            Err(e) => {
                warn!("{} - continuing in silent mode", e);
                self.sink = Box::new(NullSink::new(&self.config));
                if let Err(e) = self.start() {
                    warn!("Silent renderer unavailable: {}", e);
                }
                OutputMode::Silent
            }
        }
    }

    /// Stop the sink; once this returns no render callback is in flight
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.sink.stop();
        // Wait out any callback that grabbed the renderer before teardown
        drop(self.renderer.lock());
        self.running = false;
        info!("Audio engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            mode: self.sink.mode(),
            is_running: self.running,
            sample_rate: self.config.sample_rate_hz,
            block_size: self.config.block_size,
            backend: self.sink.backend(),
            dropouts: self.renderer.dropouts(),
        }
    }
}

impl Drop for AudioSynthesisEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
