//! Error types for configuration, audio output, and frame sources.

use std::path::PathBuf;

use thiserror::Error;

/// Rejected configuration values (raised at construction time)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A value that must be strictly positive was not
    #[error("{name} must be > 0, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    /// A value fell outside its closed range
    #[error("{name} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// NaN or infinite value
    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },

    /// FFT size that rustfft could plan but the band math cannot use
    #[error("FFT size must be power of 2, got {0}")]
    FftSize(usize),
}

/// Result type for configuration validation
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while acquiring or driving an audio sink
#[derive(Error, Debug)]
pub enum AudioError {
    /// No output device on the default host
    #[error("No audio output device found")]
    NoDevice,

    /// Failed to query device configuration
    #[error("Failed to get device config: {0}")]
    Config(String),

    /// Device cannot run f32 stereo at the requested rate
    #[error("Device does not support {sample_rate}Hz f32 stereo output")]
    UnsupportedConfig { sample_rate: u32 },

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuild(String),

    /// Failed to start/play stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlay(String),

    /// Failed to spawn the sink's pump thread
    #[error("Failed to spawn sink thread: {0}")]
    Thread(#[source] std::io::Error),

    /// WAV recording could not be created or written
    #[error("WAV recording failed: {0}")]
    Recording(#[from] hound::Error),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;

/// Errors raised by frame sources
#[derive(Error, Debug)]
pub enum SourceError {
    /// Pixel buffer length does not match the declared dimensions
    #[error("Frame buffer of {len} bytes does not match {width}x{height} RGB")]
    BadDimensions { width: u32, height: u32, len: usize },

    /// Directory listing failed
    #[error("Failed to read frame directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory contained no decodable images
    #[error("No image files found in {0}")]
    Empty(PathBuf),

    /// Image decoding failed
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Result type for frame sources
pub type SourceResult<T> = Result<T, SourceError>;
