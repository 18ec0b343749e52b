// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - The reference-counted [`WatchSet`] of script paths and per-owner
//!   [`WatchScope`]s.
//! - Turning OS notifications (`notify`) into [`FsEvent`]s that the reload
//!   engine drains once per cycle.
//! - Exclude globs and optional content hashing used to filter noise.
//!
//! It does **not** know about scripts or dependencies; classification of
//! events into load/reload/unload lives in [`crate::engine`].

pub mod cache;
pub mod events;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod set;
pub mod watcher;

pub use cache::FileCache;
pub use events::{event_channel, ChannelEventSource, EventSender, EventSource, FsEvent, FsEventKind};
pub use patterns::ExcludeFilter;
pub use set::{WatchScope, WatchSet};
pub use watcher::NotifyEventSource;
