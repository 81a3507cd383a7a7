//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::audio::{AudioSink, DeviceSink, NullSink, WavSink};
use crate::error::{ConfigResult, SourceResult};
use crate::params::{AudioConfig, ChaosConfig, MotionConfig, PipelineConfig};
use crate::source::{FrameSource, ImageSequence, SyntheticScene};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "chaoswave")]
#[command(about = "Turns body motion into a generative binaural drone", long_about = None)]
pub struct Args {
    /// Session length (seconds); image sequences may end sooner
    #[arg(long, value_name = "SECONDS", default_value = "30")]
    pub duration: f32,

    /// Control loop rate (frames per second)
    #[arg(long, value_name = "FPS", default_value = "30")]
    pub fps: f32,

    /// Read frames from a directory of images instead of the synthetic scene
    #[arg(long, value_name = "DIR")]
    pub frames: Option<PathBuf>,

    /// Restart the image sequence when it runs out
    #[arg(long, requires = "frames")]
    pub loop_frames: bool,

    /// Processing width (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "320")]
    pub width: u32,

    /// Processing height (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "240")]
    pub height: u32,

    /// Motion classification threshold [0, 1]
    #[arg(long, value_name = "T", default_value = "0.3")]
    pub threshold: f32,

    /// Seconds for stillness to decay chaos by a factor of e
    #[arg(long, value_name = "SECONDS", default_value = "2.5")]
    pub decay_time: f32,

    /// Weight of motion energy in the chaos target [0, 1]
    #[arg(long, value_name = "W", default_value = "0.6")]
    pub local_weight: f32,

    /// Weight of centre velocity in the global chaos target [0, 1]
    #[arg(long, value_name = "W", default_value = "0.4")]
    pub global_weight: f32,

    /// Output sample rate (Hz)
    #[arg(long, value_name = "HZ", default_value = "44100")]
    pub sample_rate: u32,

    /// Render block size (samples per channel)
    #[arg(long, value_name = "SAMPLES", default_value = "2048")]
    pub block_size: usize,

    /// Seed for noise, grain gating, and the synthetic scene
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Render without opening an audio device
    #[arg(long, conflicts_with = "record")]
    pub silent: bool,

    /// Record the session to a WAV file instead of playing it
    #[arg(long, value_name = "PATH")]
    pub record: Option<PathBuf>,
}

impl Args {
    /// Build and validate the pipeline configuration
    pub fn pipeline_config(&self) -> ConfigResult<PipelineConfig> {
        let config = PipelineConfig {
            motion: MotionConfig {
                width: self.width,
                height: self.height,
                threshold: self.threshold,
                ..MotionConfig::default()
            },
            chaos: ChaosConfig {
                decay_time_s: self.decay_time,
                local_weight: self.local_weight,
                global_weight: self.global_weight,
                ..ChaosConfig::default()
            },
            audio: AudioConfig {
                sample_rate_hz: self.sample_rate,
                block_size: self.block_size,
                seed: self.seed,
                ..AudioConfig::default()
            },
            frame_rate: self.fps,
        };
        config.validate()?;
        Ok(config)
    }

    /// Image directory if given, otherwise the synthetic scene
    pub fn frame_source(&self, config: &PipelineConfig) -> SourceResult<Box<dyn FrameSource>> {
        match &self.frames {
            Some(dir) => Ok(Box::new(ImageSequence::open(dir, self.loop_frames)?)),
            None => Ok(Box::new(SyntheticScene::new(
                config.motion.width,
                config.motion.height,
                self.seed as u32,
            ))),
        }
    }

    /// Sink selected by `--silent` / `--record`, the audio device otherwise
    pub fn audio_sink(&self, audio: &AudioConfig) -> Box<dyn AudioSink> {
        if let Some(path) = &self.record {
            Box::new(WavSink::new(audio, path))
        } else if self.silent {
            Box::new(NullSink::new(audio))
        } else {
            Box::new(DeviceSink::new(audio))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OutputMode;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["chaoswave"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_match_pipeline_defaults() {
        let config = parse(&[]).pipeline_config().unwrap();
        let defaults = PipelineConfig::default();

        assert_eq!(config.motion.width, defaults.motion.width);
        assert_eq!(config.motion.threshold, defaults.motion.threshold);
        assert_eq!(config.chaos.decay_time_s, defaults.chaos.decay_time_s);
        assert_eq!(config.audio.sample_rate_hz, defaults.audio.sample_rate_hz);
        assert_eq!(config.audio.block_size, defaults.audio.block_size);
        assert_eq!(config.frame_rate, defaults.frame_rate);
    }

    #[test]
    fn test_flags_flow_into_config() {
        let config = parse(&["--decay-time", "1.0", "--width", "160", "--seed", "9"])
            .pipeline_config()
            .unwrap();
        assert_eq!(config.chaos.decay_time_s, 1.0);
        assert_eq!(config.motion.width, 160);
        assert_eq!(config.audio.seed, 9);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(parse(&["--decay-time", "0"]).pipeline_config().is_err());
        assert!(parse(&["--local-weight", "1.5"]).pipeline_config().is_err());
        assert!(parse(&["--block-size", "0"]).pipeline_config().is_err());
        assert!(parse(&["--width", "100000", "--height", "100000"])
            .pipeline_config()
            .is_err());
    }

    #[test]
    fn test_silent_conflicts_with_record() {
        let argv = ["chaoswave", "--silent", "--record", "out.wav"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_sink_selection() {
        let audio = AudioConfig::default();
        assert_eq!(parse(&[]).audio_sink(&audio).mode(), OutputMode::Device);
        assert_eq!(parse(&["--silent"]).audio_sink(&audio).mode(), OutputMode::Silent);
        assert_eq!(
            parse(&["--record", "out.wav"]).audio_sink(&audio).mode(),
            OutputMode::Recording
        );
    }

    #[test]
    fn test_loop_frames_requires_frames() {
        let argv = ["chaoswave", "--loop-frames"];
        assert!(Args::try_parse_from(argv).is_err());
    }
}
