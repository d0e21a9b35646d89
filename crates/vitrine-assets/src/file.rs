//! Filesystem-backed asset contents with optional background watching.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::contents::{AssetContents, AssetListener, ListenerSet, SubscriptionId};
use crate::errors::AssetError;

/// Extensions treated as front-end source files by [`try_file_asset`].
const SOURCE_SUFFIXES: [&str; 3] = [".js", ".mjs", ".css"];

/// Messages delivered to the watch thread.
///
/// Watcher events and the stop control share one channel so the thread can
/// block on `recv()` with no polling timeout.
enum WatchSignal {
    Event(notify::Result<notify::Event>),
    Stop,
}

struct WatchHandle {
    control: Sender<WatchSignal>,
    thread: JoinHandle<()>,
}

struct FileState {
    path: PathBuf,
    cached: Mutex<Option<String>>,
    changed: ListenerSet<str>,
    deleted: ListenerSet<()>,
}

impl FileState {
    fn read(&self) -> Result<String, AssetError> {
        let mut cached = self.cached.lock();
        if let Some(text) = cached.as_ref() {
            return Ok(text.clone());
        }
        let text = std::fs::read_to_string(&self.path).map_err(|source| AssetError::Read {
            path: self.path.clone(),
            source,
        })?;
        *cached = Some(text.clone());
        Ok(text)
    }
}

/// A file on disk whose text is served to the front end.
///
/// Contents are read lazily and cached; the cache is invalidated when the
/// background watch observes a change. Without [`watch`](Self::watch) the
/// asset still works, it just never notices edits.
pub struct FileAsset {
    state: Arc<FileState>,
    watch: Mutex<Option<WatchHandle>>,
}

impl FileAsset {
    /// Wrap an existing regular file.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = std::path::absolute(path.as_ref()).map_err(|source| AssetError::Read {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        if !path.is_file() {
            return Err(AssetError::Missing { path });
        }
        Ok(Self {
            state: Arc::new(FileState {
                path,
                cached: Mutex::new(None),
                changed: ListenerSet::default(),
                deleted: ListenerSet::default(),
            }),
            watch: Mutex::new(None),
        })
    }

    /// The absolute path being served.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.state.path
    }

    /// Register `listener` to run when the file is deleted.
    pub fn on_delete(&self, listener: Arc<dyn Fn() + Send + Sync>) -> SubscriptionId {
        self.state.deleted.add(Arc::new(move |(): &()| listener()))
    }

    /// Remove a delete listener. Unknown ids are ignored.
    pub fn unsubscribe_delete(&self, id: SubscriptionId) {
        self.state.deleted.remove(id);
    }

    /// `true` while a watch thread is running.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watch.lock().is_some()
    }

    /// Start watching the file on a background thread. Idempotent.
    ///
    /// On every modify or create event the cached text is dropped, re-read,
    /// and pushed to change listeners. A delete event notifies delete
    /// listeners and ends the thread.
    pub fn watch(&self) -> Result<(), AssetError> {
        let mut slot = self.watch.lock();
        if slot.is_some() {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel();
        let events = tx.clone();
        let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |result| {
            let _ = events.send(WatchSignal::Event(result));
        })
        .map_err(|source| AssetError::Watch {
            path: self.state.path.clone(),
            source,
        })?;
        watcher
            .watch(&self.state.path, RecursiveMode::NonRecursive)
            .map_err(|source| AssetError::Watch {
                path: self.state.path.clone(),
                source,
            })?;

        let state = Arc::clone(&self.state);
        let thread = std::thread::spawn(move || {
            // Keep the watcher alive for the lifetime of the thread.
            let _watcher = watcher;
            debug!(path = %state.path.display(), "watching file asset");
            while let Ok(signal) = rx.recv() {
                match signal {
                    WatchSignal::Stop => break,
                    WatchSignal::Event(Ok(event)) => match event.kind {
                        EventKind::Remove(_) => {
                            debug!(path = %state.path.display(), "watched file deleted");
                            state.deleted.emit(&());
                            return;
                        }
                        // Some platforms report edits as create events.
                        EventKind::Modify(_) | EventKind::Create(_) => {
                            *state.cached.lock() = None;
                            match state.read() {
                                Ok(text) => state.changed.emit(&text),
                                Err(err) => {
                                    warn!(path = %state.path.display(), error = %err,
                                        "failed to re-read watched file");
                                }
                            }
                        }
                        _ => {}
                    },
                    WatchSignal::Event(Err(err)) => {
                        warn!(path = %state.path.display(), error = %err, "watch error");
                    }
                }
            }
            debug!(path = %state.path.display(), "file asset watch stopped");
        });

        *slot = Some(WatchHandle {
            control: tx,
            thread,
        });
        Ok(())
    }

    /// Stop the watch thread, if running, and wait for it to exit.
    pub fn stop_watch(&self) {
        let handle = self.watch.lock().take();
        if let Some(handle) = handle {
            // Send fails if the thread already exited after a delete.
            let _ = handle.control.send(WatchSignal::Stop);
            if handle.thread.join().is_err() {
                warn!(path = %self.state.path.display(), "watch thread panicked");
            }
        }
    }
}

impl AssetContents for FileAsset {
    fn current_text(&self) -> Result<String, AssetError> {
        self.state.read()
    }

    fn on_change(&self, listener: AssetListener) -> SubscriptionId {
        self.state.changed.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.state.changed.remove(id);
    }
}

impl Drop for FileAsset {
    fn drop(&mut self) {
        self.stop_watch();
    }
}

impl std::fmt::Debug for FileAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileAsset")
            .field("path", &self.state.path)
            .field("watching", &self.is_watching())
            .finish()
    }
}

/// Classify a state value as a reference to a local front-end source file.
///
/// A candidate qualifies when it is a single-line string with a known
/// source extension that names an existing file. Anything else (inline
/// module source, URLs, missing paths) is left as-is by the caller.
#[must_use]
pub fn try_file_asset(candidate: &str) -> Option<FileAsset> {
    if candidate.contains('\n') {
        return None;
    }
    if !SOURCE_SUFFIXES.iter().any(|s| candidate.ends_with(s)) {
        return None;
    }
    FileAsset::new(candidate).ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
