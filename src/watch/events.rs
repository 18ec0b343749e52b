// src/watch/events.rs

//! Filesystem change notifications as seen by the reload engine.
//!
//! The engine pulls events once per cycle through [`EventSource::drain`],
//! which must never block. [`NotifyEventSource`](super::NotifyEventSource) is
//! the production source; [`ChannelEventSource`] lets hosts and tests feed
//! events by hand.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Create,
    Modify,
    Remove,
}

/// A single change to an absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
}

impl FsEvent {
    pub fn new(kind: FsEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Source of pending filesystem events.
pub trait EventSource: Send {
    /// Take every event that arrived since the last call, in arrival order.
    fn drain(&mut self) -> Vec<FsEvent>;
}

/// Create a connected sender / source pair.
pub fn event_channel() -> (EventSender, ChannelEventSource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, ChannelEventSource { rx })
}

/// Handle for pushing events into a [`ChannelEventSource`].
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<FsEvent>,
}

impl EventSender {
    pub fn send(&self, event: FsEvent) {
        if self.tx.send(event).is_err() {
            debug!("event source dropped; discarding filesystem event");
        }
    }

    pub fn created(&self, path: impl Into<PathBuf>) {
        self.send(FsEvent::new(FsEventKind::Create, path));
    }

    pub fn modified(&self, path: impl Into<PathBuf>) {
        self.send(FsEvent::new(FsEventKind::Modify, path));
    }

    pub fn removed(&self, path: impl Into<PathBuf>) {
        self.send(FsEvent::new(FsEventKind::Remove, path));
    }
}

#[derive(Debug)]
pub struct ChannelEventSource {
    rx: mpsc::UnboundedReceiver<FsEvent>,
}

impl EventSource for ChannelEventSource {
    fn drain(&mut self) -> Vec<FsEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}
