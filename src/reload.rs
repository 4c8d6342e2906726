// Reload pipeline module
// Re-decodes changed files off the UI thread and posts the result back to it

use crate::app::UiMessage;
use crate::canvas::ImageId;
use crate::image_loader::ImageLoader;
use log::{debug, warn};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Fire-and-forget reloads: each one sleeps through the grace period, decodes
/// on its own worker thread and queues a `ReloadFinished` message.
pub struct ReloadPipeline {
    loader: Arc<dyn ImageLoader>,
    grace: Duration,
    queue: Sender<UiMessage>,
}

impl ReloadPipeline {
    pub fn new(loader: Arc<dyn ImageLoader>, grace: Duration, queue: Sender<UiMessage>) -> Self {
        Self {
            loader,
            grace,
            queue,
        }
    }

    pub fn schedule(&self, id: ImageId, path: PathBuf) {
        let loader = Arc::clone(&self.loader);
        let queue = self.queue.clone();
        let grace = self.grace;

        let spawned = thread::Builder::new()
            .name(format!("reload-{}", id))
            .spawn(move || {
                // Give the writer time to finish flushing the file
                thread::sleep(grace);
                let loaded = loader.try_load(&path);
                if queue
                    .send(UiMessage::ReloadFinished { id, path, loaded })
                    .is_err()
                {
                    debug!("Event loop gone, dropping reload of image {}", id);
                }
            });

        if let Err(e) = spawned {
            warn!("Failed to start reload of image {}: {}", id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::geometry::Point;
    use crate::test_support::{loaded, StubLoader};
    use std::path::Path;
    use std::sync::mpsc;
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(5);

    fn some_id() -> ImageId {
        let mut canvas = Canvas::new();
        canvas.add_image(loaded("/x.png", 1, 1), Point::ZERO)
    }

    #[test]
    fn posts_decoded_image_back() {
        let loader = Arc::new(StubLoader::default());
        loader.set("/refs/a.png", 64, 32);
        let (tx, rx) = mpsc::channel();
        let pipeline = ReloadPipeline::new(loader, Duration::ZERO, tx);
        let id = some_id();

        pipeline.schedule(id, PathBuf::from("/refs/a.png"));

        match rx.recv_timeout(WAIT).unwrap() {
            UiMessage::ReloadFinished {
                id: got,
                path,
                loaded,
            } => {
                assert_eq!(got, id);
                assert_eq!(path, Path::new("/refs/a.png"));
                let loaded = loaded.expect("stub knows this file");
                assert_eq!(loaded.aspect_ratio(), 2.0);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn reports_failed_decode_as_none() {
        let loader = Arc::new(StubLoader::default());
        let (tx, rx) = mpsc::channel();
        let pipeline = ReloadPipeline::new(loader, Duration::ZERO, tx);

        pipeline.schedule(some_id(), PathBuf::from("/refs/missing.png"));

        match rx.recv_timeout(WAIT).unwrap() {
            UiMessage::ReloadFinished { loaded, .. } => assert!(loaded.is_none()),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn waits_for_grace_period() {
        let loader = Arc::new(StubLoader::default());
        loader.set("/refs/a.png", 1, 1);
        let (tx, rx) = mpsc::channel();
        let grace = Duration::from_millis(80);
        let pipeline = ReloadPipeline::new(loader, grace, tx);

        let started = Instant::now();
        pipeline.schedule(some_id(), PathBuf::from("/refs/a.png"));
        rx.recv_timeout(WAIT).unwrap();
        assert!(started.elapsed() >= grace);
    }

    #[test]
    fn closed_queue_is_tolerated() {
        let loader = Arc::new(StubLoader::default());
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let pipeline = ReloadPipeline::new(loader.clone(), Duration::ZERO, tx);
        pipeline.schedule(some_id(), PathBuf::from("/refs/a.png"));

        // The worker finishes without panicking; its load is still counted
        let deadline = Instant::now() + WAIT;
        while loader.loads() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(loader.loads(), 1);
    }
}
