// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::watch::events::{EventSource, FsEvent, FsEventKind};

/// [`EventSource`] backed by a recursive `notify` watch on the script root.
///
/// `notify` calls back on its own thread; the callback only forwards into an
/// unbounded channel, which [`drain`](EventSource::drain) empties without
/// waiting. Dropping this value stops the OS-level watch.
pub struct NotifyEventSource {
    root: PathBuf,
    watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
}

impl std::fmt::Debug for NotifyEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyEventSource")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl NotifyEventSource {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_sender(root).map(|(source, _)| source)
    }

    /// Also returns a handle onto the backend channel, so results can be
    /// injected next to the ones `notify` delivers.
    fn with_sender(
        root: impl Into<PathBuf>,
    ) -> Result<(Self, mpsc::UnboundedSender<notify::Result<Event>>)> {
        let root = root.into();
        let (tx, rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let forward = tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // Fails only once the source is dropped.
                let _ = forward.send(res);
            },
            Config::default(),
        )?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        info!(root = ?root, "file watcher started");

        Ok((Self { root, watcher, rx }, tx))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Drop and re-register the watch on the root after the backend reported
    /// an error (e.g. the watch descriptor went stale).
    fn rearm(&mut self) {
        if let Err(err) = self.watcher.unwatch(&self.root) {
            debug!(root = ?self.root, error = %err, "unwatch before re-arm failed");
        }
        match self.watcher.watch(&self.root, RecursiveMode::Recursive) {
            Ok(()) => info!(root = ?self.root, "file watcher re-armed"),
            Err(err) => warn!(
                root = ?self.root,
                error = %err,
                "failed to re-arm file watcher; will retry on next error"
            ),
        }
    }
}

impl EventSource for NotifyEventSource {
    fn drain(&mut self) -> Vec<FsEvent> {
        let mut events = Vec::new();
        let mut needs_rearm = false;

        loop {
            match self.rx.try_recv() {
                Ok(Ok(event)) => {
                    debug!(?event, "received notify event");
                    translate_event(event, &mut events);
                }
                Ok(Err(err)) => {
                    warn!(root = ?self.root, error = %err, "file watch error");
                    needs_rearm = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!(root = ?self.root, "file watcher channel disconnected");
                    needs_rearm = true;
                    break;
                }
            }
        }

        if needs_rearm {
            self.rearm();
        }

        events
    }
}

/// Map a `notify` event onto zero or more create/modify/remove events.
fn translate_event(event: Event, out: &mut Vec<FsEvent>) {
    match event.kind {
        EventKind::Create(_) => push_all(out, FsEventKind::Create, event.paths),
        EventKind::Remove(_) => push_all(out, FsEventKind::Remove, event.paths),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            push_all(out, FsEventKind::Remove, event.paths)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            push_all(out, FsEventKind::Create, event.paths)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut paths = event.paths.into_iter();
            if let Some(from) = paths.next() {
                out.push(FsEvent::new(FsEventKind::Remove, from));
            }
            push_all(out, FsEventKind::Create, paths);
        }
        EventKind::Modify(ModifyKind::Name(_)) | EventKind::Any => {
            // Direction unknown: decide by whether the path is still there.
            for path in event.paths {
                let kind = if path.exists() {
                    FsEventKind::Create
                } else {
                    FsEventKind::Remove
                };
                out.push(FsEvent::new(kind, path));
            }
        }
        EventKind::Modify(_) => push_all(out, FsEventKind::Modify, event.paths),
        EventKind::Access(_) | EventKind::Other => {}
    }
}

fn push_all(out: &mut Vec<FsEvent>, kind: FsEventKind, paths: impl IntoIterator<Item = PathBuf>) {
    out.extend(paths.into_iter().map(|p| FsEvent::new(kind, p)));
}
