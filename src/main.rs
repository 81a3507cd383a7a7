//! chaoswave - motion-driven generative drone
//!
//! Stillness hums, waving ripples, walking scatters: each frame's motion
//! becomes a chaos level that shapes a binaural oscillator bank.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context};
use clap::Parser;
use log::info;

use chaoswave::audio::{AudioSynthesisEngine, SpectrumAnalyzer};
use chaoswave::chaos::{derive_parameters, map_position_to_pan, ChaosStateMachine};
use chaoswave::cli::Args;
use chaoswave::motion::MotionAnalyzer;
use chaoswave::params::{PipelineConfig, SpectrumConfig};
use chaoswave::source::FrameSource;

/// Interval between status lines
const STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// Control loop state: vision side of the pipeline plus the engine
struct Session {
    source: Box<dyn FrameSource>,
    analyzer: MotionAnalyzer,
    chaos: ChaosStateMachine,
    engine: AudioSynthesisEngine,
    spectrum: SpectrumAnalyzer,
    snapshot_s: f32,

    frames: u64,
    dropped: u64,
}

impl Session {
    fn new(args: &Args, config: &PipelineConfig) -> anyhow::Result<Self> {
        let source = args
            .frame_source(config)
            .context("Failed to open frame source")?;
        info!("Frames: {}", source.describe());

        let analyzer = MotionAnalyzer::new(config.motion.clone())?;
        let chaos = ChaosStateMachine::new(config.chaos.clone())?;
        let engine =
            AudioSynthesisEngine::new(config.audio.clone(), args.audio_sink(&config.audio))?;

        let spectrum_config = SpectrumConfig::for_audio(&config.audio);
        let snapshot_s = spectrum_config.fft_size as f32 / config.audio.sample_rate();
        let spectrum = SpectrumAnalyzer::new(spectrum_config)?;

        Ok(Self {
            source,
            analyzer,
            chaos,
            engine,
            spectrum,
            snapshot_s,
            frames: 0,
            dropped: 0,
        })
    }

    /// Process one frame; false once the source is exhausted
    fn step(&mut self) -> anyhow::Result<bool> {
        let Some(frame) = self.source.next_frame().context("Failed to read frame")? else {
            return Ok(false);
        };

        let metrics = self.analyzer.analyze(&frame);
        let level = self.chaos.update(&metrics, Instant::now());
        let pan = map_position_to_pan(metrics.center.x, self.analyzer.width() as f32);
        self.engine.publish(derive_parameters(level, pan));

        self.frames += 1;
        Ok(true)
    }

    fn log_status(&mut self) {
        let report = self.chaos.report();
        let params = self.engine.parameters();
        let waveform = self.engine.snapshot_waveform(self.snapshot_s);
        let bands = self.spectrum.analyze(&waveform);

        info!(
            "chaos {:.2} [{}] motion {} | {:.0}Hz beat {:.1}Hz pan {:+.2} | low {:.1} mid {:.1} high {:.1}",
            report.chaos_score,
            report.band,
            report.motion_type,
            params.base_freq,
            params.binaural_diff,
            params.pan,
            bands.low,
            bands.mid,
            bands.high
        );
    }

    /// Run the control loop until `duration` elapses or frames run out
    fn run(&mut self, frame_period: Duration, duration: Duration) -> anyhow::Result<()> {
        let start = Instant::now();
        let mut next_tick = start;
        let mut last_status = start;

        while start.elapsed() < duration {
            if !self.step()? {
                info!("Frame source exhausted");
                break;
            }

            if last_status.elapsed() >= STATUS_INTERVAL {
                self.log_status();
                last_status = Instant::now();
            }

            next_tick += frame_period;
            let now = Instant::now();
            if next_tick > now {
                thread::sleep(next_tick - now);
            } else {
                // Behind schedule: skip the missed ticks instead of catching up
                let missed = ((now - next_tick).as_secs_f64() / frame_period.as_secs_f64()) as u64;
                self.dropped += missed;
                next_tick = now;
            }
        }

        let elapsed = start.elapsed().as_secs_f32();
        self.engine.stop();
        self.log_summary(elapsed);
        Ok(())
    }

    fn log_summary(&self, elapsed_s: f32) {
        let rate = if elapsed_s > 0.0 {
            self.frames as f32 / elapsed_s
        } else {
            0.0
        };
        let motion = self.analyzer.statistics();
        let status = self.engine.status();

        info!(
            "Session: {} frames in {:.1}s ({:.1} fps), {} dropped",
            self.frames, elapsed_s, rate, self.dropped
        );
        info!(
            "Motion energy: mean {:.3}, max {:.3}, min {:.3}, std {:.3}",
            motion.mean, motion.max, motion.min, motion.std
        );
        info!(
            "Audio: {} via {}, {} render dropouts",
            status.mode, status.backend, status.dropouts
        );
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    ensure!(
        args.duration.is_finite() && args.duration > 0.0,
        "--duration must be a positive number of seconds"
    );

    let config = args.pipeline_config().context("Invalid configuration")?;
    let frame_period = Duration::try_from_secs_f32(1.0 / config.frame_rate)
        .context("Frame rate out of range")?;
    let duration = Duration::try_from_secs_f32(args.duration).context("Duration out of range")?;

    info!("chaoswave - motion-driven generative drone");

    let mut session = Session::new(&args, &config)?;
    let mode = session.engine.start_or_silent();
    info!(
        "Running for {:.0}s at {} fps, audio {}",
        args.duration, config.frame_rate, mode
    );

    session.run(frame_period, duration)
}
