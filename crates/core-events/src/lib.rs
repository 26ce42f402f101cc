//! Reader boundary signals and the sinks that deliver them to the host.
//!
//! The engine is synchronous and single-threaded; it pushes each signal into
//! a sink at the moment the state changes. Hosts either keep a `Vec` and drain
//! it after every call, or hand the engine a [`ChannelSink`] and consume the
//! receiving end from their event loop.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender};

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
// Relaxed counters, inspected by tests and logged by the host on shutdown.
// -------------------------------------------------------------------------------------------------
pub static SINK_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static EVENTS_EMITTED: AtomicU64 = AtomicU64::new(0);

/// Signals emitted by the reader engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReaderEvent {
    /// Reading position moved; carries the fresh `position / length` ratio.
    ProgressChanged(f64),
    /// `advance` found no further display line.
    ReachedEnd,
    /// `retreat` was called at offset 0.
    ReachedStart,
}

impl ReaderEvent {
    pub fn is_boundary(&self) -> bool {
        matches!(self, ReaderEvent::ReachedEnd | ReaderEvent::ReachedStart)
    }
}

/// Receiver of reader signals. Implementations must not call back into the
/// engine; the engine is not reentrant.
pub trait EventSink {
    fn emit(&mut self, event: ReaderEvent);
}

/// Default sink: drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&mut self, _event: ReaderEvent) {}
}

impl EventSink for Vec<ReaderEvent> {
    fn emit(&mut self, event: ReaderEvent) {
        EVENTS_EMITTED.fetch_add(1, Ordering::Relaxed);
        self.push(event);
    }
}

/// Forwards signals over an unbounded crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<ReaderEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<ReaderEvent>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end.
    pub fn pair() -> (Self, Receiver<ReaderEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: ReaderEvent) {
        match self.tx.send(event) {
            Ok(()) => {
                EVENTS_EMITTED.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                SINK_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(target: "events", ?event, "sink_receiver_dropped");
            }
        }
    }
}
