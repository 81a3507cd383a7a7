//! Frame sources for the control loop.
//!
//! Camera capture is outside this crate; these sources drive the pipeline
//! from a scripted synthetic scene or from a directory of still images.

use std::f32::consts::TAU;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use noise::{NoiseFn, Perlin};

use crate::error::{SourceError, SourceResult};
use crate::motion::Frame;

/// Produces frames one at a time
pub trait FrameSource {
    /// Next frame, or `None` when the source is exhausted
    fn next_frame(&mut self) -> SourceResult<Option<Frame>>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Stage of the synthetic scene's script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneAct {
    /// Body stands still at the centre
    Still,
    /// Body oscillates in place
    Waving,
    /// Body walks across the frame
    Walking,
}

/// Frames spent in each act: still, waving, walking
const SCRIPT: [(SceneAct, u32); 3] = [
    (SceneAct::Still, 60),
    (SceneAct::Waving, 90),
    (SceneAct::Walking, 120),
];

/// Waving period (frames)
const WAVE_PERIOD: f32 = 12.0;

/// Deterministic textured scene with a moving "body" disc
pub struct SyntheticScene {
    width: u32,
    height: u32,
    frame_index: u64,
    perlin: Perlin,
    background: Vec<u8>,
}

impl SyntheticScene {
    pub fn new(width: u32, height: u32, seed: u32) -> Self {
        let perlin = Perlin::new(seed);
        let mut background = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                let n = perlin.get([x as f64 * 0.07, y as f64 * 0.07]) as f32;
                background.push((60.0 + n * 40.0).clamp(0.0, 255.0) as u8);
            }
        }

        Self {
            width,
            height,
            frame_index: 0,
            perlin,
            background,
        }
    }

    /// Script act and the frame offset within it
    pub fn act_at(frame_index: u64) -> (SceneAct, u32) {
        let cycle: u32 = SCRIPT.iter().map(|(_, len)| len).sum();
        let mut offset = (frame_index % cycle as u64) as u32;
        for (act, len) in SCRIPT {
            if offset < len {
                return (act, offset);
            }
            offset -= len;
        }
        (SceneAct::Still, 0)
    }

    /// Body centre (pixels) for a frame index
    pub fn body_center(&self, frame_index: u64) -> (f32, f32) {
        let (w, h) = (self.width as f32, self.height as f32);
        let (act, offset) = Self::act_at(frame_index);
        let x = match act {
            SceneAct::Still => w * 0.5,
            SceneAct::Waving => w * 0.5 + w * 0.04 * (TAU * offset as f32 / WAVE_PERIOD).sin(),
            SceneAct::Walking => {
                let progress = offset as f32 / SCRIPT[2].1 as f32;
                w * (0.15 + 0.7 * progress)
            }
        };
        (x, h * 0.5)
    }

    fn render(&self, frame_index: u64) -> SourceResult<Frame> {
        let (cx, cy) = self.body_center(frame_index);
        let radius = self.height as f32 / 5.0;
        let radius_sq = radius * radius;

        let mut pixels = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let value = if dx * dx + dy * dy <= radius_sq {
                    // Texture is attached to the body so it moves with it
                    let n = self.perlin.get([dx as f64 * 0.15, dy as f64 * 0.15 + 100.0]) as f32;
                    (190.0 + n * 60.0).clamp(0.0, 255.0) as u8
                } else {
                    self.background[y as usize * self.width as usize + x as usize]
                };
                pixels.extend_from_slice(&[value, value, value]);
            }
        }
        Frame::from_rgb(self.width, self.height, pixels)
    }
}

impl FrameSource for SyntheticScene {
    fn next_frame(&mut self) -> SourceResult<Option<Frame>> {
        let frame = self.render(self.frame_index)?;
        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn describe(&self) -> String {
        format!("synthetic scene {}x{}", self.width, self.height)
    }
}

/// Image files in a directory, in file-name order
pub struct ImageSequence {
    dir: PathBuf,
    paths: Vec<PathBuf>,
    position: usize,
    looping: bool,
}

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

impl ImageSequence {
    /// List the directory's images (fails if there are none)
    pub fn open(dir: impl AsRef<Path>, looping: bool) -> SourceResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        let entries = fs::read_dir(&dir).map_err(|source| SourceError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(SourceError::Empty(dir));
        }
        debug!("Found {} frames in {}", paths.len(), dir.display());

        Ok(Self {
            dir,
            paths,
            position: 0,
            looping,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> SourceResult<Option<Frame>> {
        if self.position >= self.paths.len() {
            if !self.looping {
                return Ok(None);
            }
            self.position = 0;
        }

        let path = &self.paths[self.position];
        let image = image::open(path).map_err(|source| SourceError::Decode {
            path: path.clone(),
            source,
        })?;
        self.position += 1;
        Frame::from_image(image.to_rgb8()).map(Some)
    }

    fn describe(&self) -> String {
        let looping = if self.looping { ", looping" } else { "" };
        format!(
            "{} images from {}{}",
            self.paths.len(),
            self.dir.display(),
            looping
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_script_acts() {
        assert_eq!(SyntheticScene::act_at(0), (SceneAct::Still, 0));
        assert_eq!(SyntheticScene::act_at(60), (SceneAct::Waving, 0));
        assert_eq!(SyntheticScene::act_at(150), (SceneAct::Walking, 0));
        assert_eq!(SyntheticScene::act_at(269), (SceneAct::Walking, 119));
        assert_eq!(SyntheticScene::act_at(270), (SceneAct::Still, 0));
    }

    #[test]
    fn test_synthetic_scene_is_deterministic() {
        let mut a = SyntheticScene::new(64, 48, 7);
        let mut b = SyntheticScene::new(64, 48, 7);
        for _ in 0..3 {
            let fa = a.next_frame().unwrap().unwrap();
            let fb = b.next_frame().unwrap().unwrap();
            assert_eq!(fa.as_image(), fb.as_image());
            assert_eq!((fa.width(), fa.height()), (64, 48));
        }
    }

    #[test]
    fn test_still_act_repeats_frames() {
        let mut scene = SyntheticScene::new(64, 48, 1);
        let first = scene.next_frame().unwrap().unwrap();
        let second = scene.next_frame().unwrap().unwrap();
        assert_eq!(first.as_image(), second.as_image());
    }

    #[test]
    fn test_walking_moves_right() {
        let scene = SyntheticScene::new(320, 240, 1);
        let (start, _) = scene.body_center(150);
        let (later, _) = scene.body_center(200);
        assert!(later > start);
    }

    fn write_image(dir: &Path, name: &str, shade: u8) {
        let image = RgbImage::from_pixel(8, 6, Rgb([shade, shade, shade]));
        image.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_image_sequence_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "b.png", 20);
        write_image(dir.path(), "a.png", 10);
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let mut sequence = ImageSequence::open(dir.path(), false).unwrap();
        assert_eq!(sequence.len(), 2);

        let first = sequence.next_frame().unwrap().unwrap();
        assert_eq!(first.as_image().get_pixel(0, 0), &Rgb([10, 10, 10]));
        let second = sequence.next_frame().unwrap().unwrap();
        assert_eq!(second.as_image().get_pixel(0, 0), &Rgb([20, 20, 20]));
        assert!(sequence.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_image_sequence_loops() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "only.png", 99);

        let mut sequence = ImageSequence::open(dir.path(), true).unwrap();
        for _ in 0..3 {
            assert!(sequence.next_frame().unwrap().is_some());
        }
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageSequence::open(dir.path(), false),
            Err(SourceError::Empty(_))
        ));
    }

    #[test]
    fn test_corrupt_image_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.png"), b"not a png").unwrap();

        let mut sequence = ImageSequence::open(dir.path(), false).unwrap();
        match sequence.next_frame() {
            Err(SourceError::Decode { path, .. }) => assert!(path.ends_with("broken.png")),
            other => panic!("expected decode error, got {:?}", other.map(|f| f.is_some())),
        }
    }
}
