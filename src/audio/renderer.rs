//! Block renderer shared between the engine and its sink.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use super::voice::Voice;
use crate::bus::ParameterReader;
use crate::params::AudioConfig;

/// Render state: parameter reader, voice, and preallocated scratch buffers
pub(crate) struct Renderer {
    reader: ParameterReader,
    voice: Voice,
    block_size: usize,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl Renderer {
    pub fn new(config: &AudioConfig, reader: ParameterReader) -> Self {
        Self {
            reader,
            voice: Voice::new(config),
            block_size: config.block_size,
            left: vec![0.0; config.block_size],
            right: vec![0.0; config.block_size],
        }
    }

    /// Render one block with the newest published parameters
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let params = self.reader.current();
        self.voice.render(&params, left, right);
    }

    /// Fill an interleaved device buffer, one block-sized chunk at a time
    pub fn fill_interleaved(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for chunk in data.chunks_mut(self.block_size * channels) {
            let frames = chunk.len() / channels;
            let params = self.reader.current();
            let (left, right) = (&mut self.left[..frames], &mut self.right[..frames]);
            self.voice.render(&params, left, right);

            for (i, frame) in chunk.chunks_mut(channels).enumerate() {
                if i >= frames {
                    frame.fill(0.0);
                    continue;
                }
                frame[0] = left[i];
                if channels > 1 {
                    frame[1] = right[i];
                }
                for ch in frame.iter_mut().skip(2) {
                    *ch = 0.0;
                }
            }
        }
    }

    #[cfg(test)]
    pub fn voice(&self) -> &Voice {
        &self.voice
    }
}

/// Renderer handle shared with a sink's callback or thread
///
/// Realtime paths use `try_*` methods only: contention yields silence and is
/// counted as a dropout instead of blocking.
#[derive(Clone)]
pub struct SharedRenderer {
    inner: Arc<Mutex<Renderer>>,
    dropouts: Arc<AtomicU64>,
}

impl SharedRenderer {
    pub(crate) fn new(renderer: Renderer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(renderer)),
            dropouts: Arc::new(AtomicU64::new(0)),
        }
    }

    fn try_renderer(&self) -> Option<MutexGuard<'_, Renderer>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {
                self.dropouts.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Render a planar stereo block, or silence if the renderer is busy
    pub fn try_fill_stereo(&self, left: &mut [f32], right: &mut [f32]) {
        match self.try_renderer() {
            Some(mut renderer) => renderer.render(left, right),
            None => {
                left.fill(0.0);
                right.fill(0.0);
            }
        }
    }

    /// Fill an interleaved buffer, or silence if the renderer is busy
    pub fn try_fill_interleaved(&self, data: &mut [f32], channels: usize) {
        match self.try_renderer() {
            Some(mut renderer) => renderer.fill_interleaved(data, channels),
            None => data.fill(0.0),
        }
    }

    /// Blocking access for non-realtime callers
    pub(crate) fn lock(&self) -> MutexGuard<'_, Renderer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of callbacks answered with silence because the renderer was busy
    pub fn dropouts(&self) -> u64 {
        self.dropouts.load(Ordering::Relaxed)
    }
}
