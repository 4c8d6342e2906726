// File watching module
// Keeps one directory subscription per watched folder and debounces change notifications

use crate::canvas::{Canvas, CanvasChange};
use crate::image_loader::is_image_file;
use log::{debug, info, warn};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Case-insensitive lookup key for a path
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

/// Kind of filesystem change that can trigger a reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Renamed,
}

impl ChangeKind {
    /// Classify a notify event, ignoring kinds that never warrant a reload
    pub fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(ChangeKind::Created),
            EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Renamed),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(ChangeKind::Modified),
            _ => None,
        }
    }
}

/// A change notification for one path under a watched directory
#[derive(Debug, Clone, PartialEq)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Callback receiving change notifications, called from the watcher's own thread
pub type ChangeSink = Arc<dyn Fn(FileChange) + Send + Sync>;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch {path}: {source}")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// A live directory subscription
pub trait Subscription {
    /// Stop delivering notifications. Called before the handle is dropped.
    fn unsubscribe(&mut self);
}

/// Creates directory subscriptions
pub trait WatchBackend {
    fn subscribe(&mut self, directory: &Path) -> Result<Box<dyn Subscription>, WatchError>;
}

/// Backend using the platform's native notifications through `notify`
pub struct NotifyBackend {
    sink: ChangeSink,
}

impl NotifyBackend {
    pub fn new(sink: ChangeSink) -> Self {
        Self { sink }
    }
}

impl WatchBackend for NotifyBackend {
    fn subscribe(&mut self, directory: &Path) -> Result<Box<dyn Subscription>, WatchError> {
        let live = Arc::new(AtomicBool::new(true));
        let callback_live = Arc::clone(&live);
        let sink = Arc::clone(&self.sink);

        let to_error = |source| WatchError::Notify {
            path: directory.to_path_buf(),
            source,
        };

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            if !callback_live.load(Ordering::SeqCst) {
                return;
            }
            match result {
                Ok(event) => {
                    let Some(kind) = ChangeKind::from_event_kind(&event.kind) else {
                        return;
                    };
                    for path in event.paths {
                        sink(FileChange { path, kind });
                    }
                }
                Err(e) => warn!("File watcher error: {}", e),
            }
        })
        .map_err(to_error)?;

        watcher
            .watch(directory, RecursiveMode::NonRecursive)
            .map_err(to_error)?;

        Ok(Box::new(NotifySubscription {
            watcher,
            directory: directory.to_path_buf(),
            live,
        }))
    }
}

struct NotifySubscription {
    watcher: RecommendedWatcher,
    directory: PathBuf,
    live: Arc<AtomicBool>,
}

impl Subscription for NotifySubscription {
    fn unsubscribe(&mut self) {
        // Silence the callback first so nothing fires into a released entry
        self.live.store(false, Ordering::SeqCst);
        if let Err(e) = self.watcher.unwatch(&self.directory) {
            debug!("Unwatch {} failed: {}", self.directory.display(), e);
        }
    }
}

/// Directory subscriptions and the per-file reload debounce table
pub struct WatchRegistry {
    backend: Box<dyn WatchBackend>,
    subscriptions: HashMap<String, Box<dyn Subscription>>,
    last_reload: HashMap<String, Instant>,
    debounce: Duration,
}

impl WatchRegistry {
    pub fn new(backend: Box<dyn WatchBackend>, debounce: Duration) -> Self {
        Self {
            backend,
            subscriptions: HashMap::new(),
            last_reload: HashMap::new(),
            debounce,
        }
    }

    /// Number of live directory subscriptions
    pub fn watched_directories(&self) -> usize {
        self.subscriptions.len()
    }

    /// Bring subscriptions in line with one canvas change.
    ///
    /// `canvas` must already reflect the change.
    pub fn apply(&mut self, change: &CanvasChange, canvas: &Canvas) {
        match change {
            CanvasChange::Added { path, .. } => self.watch_file(path),
            CanvasChange::Removed { path, .. } => self.release_if_unused(path, canvas),
            CanvasChange::Cleared => self.clear(),
        }
    }

    fn watch_file(&mut self, file: &Path) {
        let Some(directory) = parent_directory(file) else {
            return;
        };
        let key = path_key(directory);
        if self.subscriptions.contains_key(&key) {
            return;
        }

        match self.backend.subscribe(directory) {
            Ok(subscription) => {
                info!("Watching for changes: {}", directory.display());
                self.subscriptions.insert(key, subscription);
            }
            Err(e) => warn!("Live reload unavailable: {}", e),
        }
    }

    fn release_if_unused(&mut self, file: &Path, canvas: &Canvas) {
        let Some(directory) = parent_directory(file) else {
            return;
        };
        if canvas.has_image_in_directory(directory) {
            return;
        }
        if let Some(mut subscription) = self.subscriptions.remove(&path_key(directory)) {
            subscription.unsubscribe();
            info!("Stopped watching: {}", directory.display());
        }
    }

    /// Release every subscription and forget debounce history
    pub fn clear(&mut self) {
        for (_, mut subscription) in self.subscriptions.drain() {
            subscription.unsubscribe();
        }
        self.last_reload.clear();
    }

    /// Decide whether a change notification should trigger a reload.
    ///
    /// Non-image paths are ignored, and a path accepted less than the
    /// debounce window ago is dropped. Accepting a path restarts its window.
    pub fn accept(&mut self, path: &Path, now: Instant) -> bool {
        if !is_image_file(path) {
            debug!("Skipped {}: not an image file", path.display());
            return false;
        }

        let key = path_key(path);
        if let Some(&last) = self.last_reload.get(&key) {
            if now.saturating_duration_since(last) < self.debounce {
                debug!("Skipped {}: debounced", path.display());
                return false;
            }
        }

        self.last_reload.insert(key, now);
        true
    }
}

impl Drop for WatchRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}

fn parent_directory(file: &Path) -> Option<&Path> {
    file.parent().filter(|dir| !dir.as_os_str().is_empty())
}
