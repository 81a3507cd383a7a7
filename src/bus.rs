//! Lock-free parameter handoff from the control loop to the render path.
//!
//! The control loop publishes whole [`SynthesisParameters`] snapshots into an
//! `rtrb` single-producer/single-consumer ring. The render side drains the
//! ring at the start of every block and keeps the newest value:
//!
//! - Publishing never blocks (a full ring parks the snapshot for retry)
//! - Reading never blocks and never allocates
//! - A snapshot is either entirely visible or not at all

use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::chaos::SynthesisParameters;

/// Control-loop side of the parameter bus
pub struct ParameterPublisher {
    tx: Producer<SynthesisParameters>,
    pending: Option<SynthesisParameters>,
    latest: SynthesisParameters,
}

/// Render side of the parameter bus
pub struct ParameterReader {
    rx: Consumer<SynthesisParameters>,
    current: SynthesisParameters,
}

/// Create a connected publisher/reader pair
///
/// Both sides start from `initial`. `capacity` is clamped to at least one slot.
pub fn parameter_bus(
    initial: SynthesisParameters,
    capacity: usize,
) -> (ParameterPublisher, ParameterReader) {
    let (tx, rx) = RingBuffer::new(capacity.max(1));
    (
        ParameterPublisher {
            tx,
            pending: None,
            latest: initial,
        },
        ParameterReader {
            rx,
            current: initial,
        },
    )
}

impl ParameterPublisher {
    /// Publish a snapshot (never blocks)
    pub fn publish(&mut self, params: SynthesisParameters) {
        self.latest = params;
        // A newer snapshot supersedes anything still waiting
        self.pending = Some(params);
        self.flush();
    }

    /// Retry a snapshot that did not fit last time
    ///
    /// Returns true when nothing is left pending.
    pub fn flush(&mut self) -> bool {
        if let Some(params) = self.pending.take() {
            if let Err(PushError::Full(params)) = self.tx.push(params) {
                self.pending = Some(params);
                return false;
            }
        }
        true
    }

    /// Last snapshot handed to `publish`
    pub fn latest(&self) -> SynthesisParameters {
        self.latest
    }

    /// Whether a snapshot is parked waiting for ring space
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl ParameterReader {
    /// Newest complete snapshot (drains the ring)
    ///
    /// Reuses the previous snapshot when nothing new has arrived.
    pub fn current(&mut self) -> SynthesisParameters {
        while let Ok(params) = self.rx.pop() {
            self.current = params;
        }
        self.current
    }
}
