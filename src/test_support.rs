// Test helpers shared by the unit tests

use crate::image_loader::{Bitmap, ImageLoader, LoadedImage};
use crate::watch::{path_key, Subscription, WatchBackend, WatchError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A decoded image of the given pixel size, backed by `path`
pub fn loaded(path: &str, width: u32, height: u32) -> LoadedImage {
    let pixels = vec![0; (width * height * 4) as usize];
    LoadedImage::new(PathBuf::from(path), Bitmap::new(width, height, pixels))
}

/// Fresh, empty directory under the system temp dir
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("refpin-tests")
        .join(format!("{}-{}", std::process::id(), name));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Loader serving in-memory images by path
#[derive(Default)]
pub struct StubLoader {
    images: Mutex<HashMap<String, (String, u32, u32)>>,
    loads: AtomicUsize,
}

impl StubLoader {
    pub fn set(&self, path: &str, width: u32, height: u32) {
        self.images
            .lock()
            .unwrap()
            .insert(path_key(Path::new(path)), (path.to_string(), width, height));
    }

    pub fn remove(&self, path: &str) {
        self.images.lock().unwrap().remove(&path_key(Path::new(path)));
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ImageLoader for StubLoader {
    fn try_load(&self, path: &Path) -> Option<LoadedImage> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let images = self.images.lock().unwrap();
        let (stored, width, height) = images.get(&path_key(path))?;
        Some(loaded(stored, *width, *height))
    }
}

#[derive(Default)]
struct Calls {
    subscribed: Vec<PathBuf>,
    unsubscribed: Vec<PathBuf>,
}

/// Shared view of what a `RecordingBackend` was asked to do
#[derive(Clone, Default)]
pub struct WatchLog(Arc<Mutex<Calls>>);

impl WatchLog {
    pub fn subscribed(&self) -> Vec<PathBuf> {
        self.0.lock().unwrap().subscribed.clone()
    }

    pub fn unsubscribed(&self) -> Vec<PathBuf> {
        self.0.lock().unwrap().unsubscribed.clone()
    }
}

/// Watch backend that records subscriptions instead of touching the filesystem
#[derive(Default)]
pub struct RecordingBackend {
    log: WatchLog,
    fail: bool,
}

impl RecordingBackend {
    pub fn failing() -> Self {
        Self {
            log: WatchLog::default(),
            fail: true,
        }
    }

    pub fn log(&self) -> WatchLog {
        self.log.clone()
    }
}

impl WatchBackend for RecordingBackend {
    fn subscribe(&mut self, directory: &Path) -> Result<Box<dyn Subscription>, WatchError> {
        if self.fail {
            return Err(WatchError::Notify {
                path: directory.to_path_buf(),
                source: notify::Error::generic("permission denied"),
            });
        }
        self.log.0.lock().unwrap().subscribed.push(directory.to_path_buf());
        Ok(Box::new(RecordedSubscription {
            directory: directory.to_path_buf(),
            log: self.log.clone(),
        }))
    }
}

struct RecordedSubscription {
    directory: PathBuf,
    log: WatchLog,
}

impl Subscription for RecordedSubscription {
    fn unsubscribe(&mut self) {
        self.log
            .0
            .lock()
            .unwrap()
            .unsubscribed
            .push(self.directory.clone());
    }
}
