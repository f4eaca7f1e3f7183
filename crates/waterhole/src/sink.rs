//! Occupancy notifications.
//!
//! The pool invokes its sink synchronously, from inside its critical section,
//! on every slot transition. Sinks must return promptly: anything that needs
//! its own execution context (a UI thread, a writer task) should take the
//! event through [`ChannelSink`] and do the work on the receiving side.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::actor::{ActorId, Species};
use crate::pool::PoolId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Occupancy {
    Enter,
    Exit,
}

/// A single slot transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccupancyEvent {
    pub pool: PoolId,
    pub slot: usize,
    pub actor: ActorId,
    pub species: Species,
    pub status: Occupancy,
}

pub trait OccupancySink: Send + Sync + 'static {
    fn on_change(&self, event: &OccupancyEvent);
}

impl<F> OccupancySink for F
where
    F: Fn(&OccupancyEvent) + Send + Sync + 'static,
{
    fn on_change(&self, event: &OccupancyEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl OccupancySink for NoopSink {
    fn on_change(&self, _event: &OccupancyEvent) {}
}

/// Posts events into an unbounded channel.
///
/// Sending never blocks. Once the receiver is dropped, events are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OccupancyEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OccupancyEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl OccupancySink for ChannelSink {
    fn on_change(&self, event: &OccupancyEvent) {
        if self.tx.send(event.clone()).is_err() {
            tracing::trace!(pool = %event.pool, slot = event.slot, "Occupancy receiver gone, dropping event");
        }
    }
}

/// Emits each transition as a debug-level tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl OccupancySink for TracingSink {
    fn on_change(&self, event: &OccupancyEvent) {
        tracing::debug!(
            pool = %event.pool,
            slot = event.slot,
            actor = %event.actor,
            species = %event.species,
            status = ?event.status,
            "Occupancy changed"
        );
    }
}

/// Forwards every event to each inner sink, in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn OccupancySink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn OccupancySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl OccupancySink for FanoutSink {
    fn on_change(&self, event: &OccupancyEvent) {
        for sink in &self.sinks {
            sink.on_change(event);
        }
    }
}
