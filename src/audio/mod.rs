//! Audio synthesis: oscillator voice, renderer, sinks, and spectrum summary.

mod engine;
mod renderer;
mod sink;
mod spectrum;
mod voice;

pub use engine::{AudioSynthesisEngine, EngineStatus, StereoBuffer};
pub use renderer::SharedRenderer;
pub use sink::{AudioSink, DeviceSink, NullSink, OutputMode, WavSink};
pub use spectrum::{SpectrumAnalyzer, SpectrumBands};
pub use voice::pan_gains;
