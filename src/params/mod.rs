//! Parameter definitions with physical units and documented semantics.
//!
//! All tuning constants live here with:
//! - Physical units (Hz, seconds, pixels, etc.)
//! - Documented ranges and meanings
//! - A `validate()` that rejects values the pipeline cannot run with

mod audio;
mod chaos;
mod checks;
mod motion;
mod pipeline;

// Re-export all types
pub use audio::{audio_constants, AudioConfig, SpectrumConfig};
pub use chaos::ChaosConfig;
pub use motion::MotionConfig;
pub use pipeline::PipelineConfig;
