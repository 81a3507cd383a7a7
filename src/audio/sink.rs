//! Output sinks: where rendered blocks go.
//!
//! - `DeviceSink`: cpal output stream on the default device
//! - `NullSink`: real-time paced thread that discards blocks
//! - `WavSink`: real-time paced thread that records a float WAV

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig, SupportedBufferSize};
use log::{debug, error, info};

use super::renderer::SharedRenderer;
use crate::error::{AudioError, AudioResult};
use crate::params::AudioConfig;

/// What an engine's output is connected to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Audio device playback
    Device,
    /// Rendering without output
    Silent,
    /// Rendering to a WAV file
    Recording,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputMode::Device => "device",
            OutputMode::Silent => "silent",
            OutputMode::Recording => "recording",
        };
        f.write_str(name)
    }
}

/// Something that pulls rendered blocks from a [`SharedRenderer`]
///
/// `start` and `stop` are only called by the engine, which guarantees they
/// alternate. After `stop` returns no further render call may be issued.
pub trait AudioSink {
    fn mode(&self) -> OutputMode;

    /// Human-readable backend name for status reports
    fn backend(&self) -> String;

    fn start(&mut self, renderer: SharedRenderer) -> AudioResult<()>;

    fn stop(&mut self);
}

// ---------------------------------------------------------------------------
// Device output
// ---------------------------------------------------------------------------

/// Default output device via cpal
pub struct DeviceSink {
    sample_rate: u32,
    block_size: u32,
    backend: String,
    stream: Option<cpal::Stream>,
}

impl DeviceSink {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            sample_rate: config.sample_rate_hz,
            block_size: config.block_size as u32,
            backend: cpal::default_host().id().name().to_string(),
            stream: None,
        }
    }

    /// Pick an f32 config with at least two channels at our sample rate
    fn stream_config(&self, device: &cpal::Device) -> AudioResult<StreamConfig> {
        let supported: Vec<_> = device
            .supported_output_configs()
            .map_err(|e| AudioError::Config(e.to_string()))?
            .collect();

        let best = supported
            .iter()
            .filter(|c| c.sample_format() == SampleFormat::F32)
            .filter(|c| c.channels() >= 2)
            .find(|c| {
                self.sample_rate >= c.min_sample_rate().0 && self.sample_rate <= c.max_sample_rate().0
            })
            .ok_or(AudioError::UnsupportedConfig {
                sample_rate: self.sample_rate,
            })?;

        // Fixed size when the device allows it, otherwise let the host choose
        let buffer_size = match best.buffer_size() {
            SupportedBufferSize::Range { min, max }
                if (*min..=*max).contains(&self.block_size) =>
            {
                BufferSize::Fixed(self.block_size)
            }
            _ => BufferSize::Default,
        };

        Ok(StreamConfig {
            channels: best.channels(),
            sample_rate: SampleRate(self.sample_rate),
            buffer_size,
        })
    }
}

impl AudioSink for DeviceSink {
    fn mode(&self) -> OutputMode {
        OutputMode::Device
    }

    fn backend(&self) -> String {
        self.backend.clone()
    }

    fn start(&mut self, renderer: SharedRenderer) -> AudioResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio device: {}", device_name);

        let config = self.stream_config(&device)?;
        let channels = config.channels as usize;
        info!(
            "Audio config: {} channels, {}Hz, buffer {:?}",
            config.channels,
            config.sample_rate.0,
            config.buffer_size
        );

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    renderer.try_fill_interleaved(data, channels);
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlay(e.to_string()))?;

        self.backend = format!("{} ({})", host.id().name(), device_name);
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!("Pausing audio stream failed: {}", e);
            }
            // Dropping the stream joins the callback
            drop(stream);
        }
    }
}

// ---------------------------------------------------------------------------
// Paced block pump (silent and recording sinks)
// ---------------------------------------------------------------------------

/// Consumer of rendered blocks on the pump thread
trait BlockWriter: Send + 'static {
    fn write_block(&mut self, left: &[f32], right: &[f32]) -> AudioResult<()>;

    fn finish(self) -> AudioResult<()>;
}

/// Thread that renders one block per block period until stopped
struct Pump {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<AudioResult<()>>>,
}

impl Pump {
    fn spawn<W: BlockWriter>(
        name: &str,
        renderer: SharedRenderer,
        config: &AudioConfig,
        mut writer: W,
    ) -> AudioResult<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let block_size = config.block_size;
        let period = config.block_duration();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut left = vec![0.0; block_size];
                let mut right = vec![0.0; block_size];
                let mut failure = None;
                let mut deadline = Instant::now();

                while !stop_flag.load(Ordering::Acquire) {
                    renderer.try_fill_stereo(&mut left, &mut right);
                    if failure.is_none() {
                        if let Err(e) = writer.write_block(&left, &right) {
                            failure = Some(e);
                        }
                    }

                    deadline += period;
                    let now = Instant::now();
                    if deadline > now {
                        thread::sleep(deadline - now);
                    } else if now - deadline > period * 4 {
                        // Fell far behind: resynchronize instead of bursting
                        deadline = now;
                    }
                }

                let finished = writer.finish();
                match failure {
                    Some(e) => Err(e),
                    None => finished,
                }
            })
            .map_err(AudioError::Thread)?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    fn stop(&mut self) -> AudioResult<()> {
        self.stop.store(true, Ordering::Release);
        match self.handle.take().map(|h| h.join()) {
            Some(Ok(result)) => result,
            Some(Err(_)) => {
                error!("Sink thread panicked");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("{}", e);
        }
    }
}

// ---------------------------------------------------------------------------
// Silent output
// ---------------------------------------------------------------------------

struct Discard;

impl BlockWriter for Discard {
    fn write_block(&mut self, _left: &[f32], _right: &[f32]) -> AudioResult<()> {
        Ok(())
    }

    fn finish(self) -> AudioResult<()> {
        Ok(())
    }
}

/// Renders at real-time cadence and discards the output
pub struct NullSink {
    config: AudioConfig,
    pump: Option<Pump>,
}

impl NullSink {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            config: config.clone(),
            pump: None,
        }
    }
}

impl AudioSink for NullSink {
    fn mode(&self) -> OutputMode {
        OutputMode::Silent
    }

    fn backend(&self) -> String {
        "null".to_string()
    }

    fn start(&mut self, renderer: SharedRenderer) -> AudioResult<()> {
        if self.pump.is_none() {
            self.pump = Some(Pump::spawn("chaoswave-null", renderer, &self.config, Discard)?);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut pump) = self.pump.take() {
            if let Err(e) = pump.stop() {
                error!("{}", e);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// WAV recording
// ---------------------------------------------------------------------------

struct WavBlocks {
    writer: hound::WavWriter<BufWriter<File>>,
}

impl BlockWriter for WavBlocks {
    fn write_block(&mut self, left: &[f32], right: &[f32]) -> AudioResult<()> {
        for (&l, &r) in left.iter().zip(right) {
            self.writer.write_sample(l)?;
            self.writer.write_sample(r)?;
        }
        Ok(())
    }

    fn finish(self) -> AudioResult<()> {
        self.writer.finalize()?;
        Ok(())
    }
}

/// Renders at real-time cadence into a 32-bit float stereo WAV file
pub struct WavSink {
    config: AudioConfig,
    path: PathBuf,
    pump: Option<Pump>,
}

impl WavSink {
    pub fn new(config: &AudioConfig, path: impl AsRef<Path>) -> Self {
        Self {
            config: config.clone(),
            path: path.as_ref().to_path_buf(),
            pump: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSink for WavSink {
    fn mode(&self) -> OutputMode {
        OutputMode::Recording
    }

    fn backend(&self) -> String {
        format!("wav ({})", self.path.display())
    }

    fn start(&mut self, renderer: SharedRenderer) -> AudioResult<()> {
        if self.pump.is_some() {
            return Ok(());
        }

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: self.config.sample_rate_hz,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let writer = hound::WavWriter::create(&self.path, spec)?;
        info!("Recording audio to {}", self.path.display());

        self.pump = Some(Pump::spawn(
            "chaoswave-wav",
            renderer,
            &self.config,
            WavBlocks { writer },
        )?);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut pump) = self.pump.take() {
            match pump.stop() {
                Ok(()) => info!("Recording saved: {}", self.path.display()),
                Err(e) => error!("{}", e),
            }
        }
    }
}

/// Pause long enough for a pump to render at least `blocks` blocks
#[cfg(test)]
pub(crate) fn wait_blocks(config: &AudioConfig, blocks: u32) {
    thread::sleep(config.block_duration() * blocks + std::time::Duration::from_millis(20));
}
