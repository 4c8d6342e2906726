// Application state module
// Owns the canvas and runs the single-threaded event loop that mutates it

use crate::canvas::{Canvas, ImageId};
use crate::config::{Settings, CASCADE_STEP, FIRST_IMAGE_POSITION};
use crate::geometry::Point;
use crate::image_loader::{is_image_file, ImageLoader, LoadedImage};
use crate::input::{help_text, Command, Wheel};
use crate::reload::ReloadPipeline;
use crate::transform::WHEEL_ZOOM_STEP;
use crate::watch::{ChangeSink, FileChange, NotifyBackend, WatchBackend, WatchRegistry};
use log::{debug, info, warn};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;

/// Work queued for the event loop from any thread
#[derive(Debug)]
pub enum UiMessage {
    /// A user gesture from the input thread
    Command(Command),
    /// A filesystem notification from a watcher thread
    FileChanged(FileChange),
    /// A reload worker finished decoding
    ReloadFinished {
        id: ImageId,
        path: PathBuf,
        loaded: Option<LoadedImage>,
    },
    /// Input ended
    Shutdown,
}

/// Forward watcher notifications onto the event queue
fn change_sink(queue: Sender<UiMessage>) -> ChangeSink {
    Arc::new(move |change| {
        if queue.send(UiMessage::FileChanged(change)).is_err() {
            debug!("Event loop gone, dropping file change notification");
        }
    })
}

/// Main application state.
///
/// Everything here lives on the event-loop thread; other threads only talk
/// to it through the [`UiMessage`] queue.
pub struct App {
    canvas: Canvas,
    watches: Option<WatchRegistry>,
    reloads: ReloadPipeline,
    loader: Arc<dyn ImageLoader>,
    queue: Sender<UiMessage>,
    inbox: Receiver<UiMessage>,
    next_position: Point,
    should_exit: bool,
}

impl App {
    /// Create the application with native filesystem watching
    pub fn new(settings: &Settings, loader: Arc<dyn ImageLoader>) -> Self {
        Self::with_backend(settings, loader, |queue| -> Box<dyn WatchBackend> {
            Box::new(NotifyBackend::new(change_sink(queue)))
        })
    }

    /// Create the application with a custom watch backend, built from the event queue
    pub fn with_backend(
        settings: &Settings,
        loader: Arc<dyn ImageLoader>,
        backend: impl FnOnce(Sender<UiMessage>) -> Box<dyn WatchBackend>,
    ) -> Self {
        let (queue, inbox) = mpsc::channel();

        let watches = settings
            .watch_files
            .then(|| WatchRegistry::new(backend(queue.clone()), settings.debounce));
        let reloads = ReloadPipeline::new(Arc::clone(&loader), settings.reload_grace, queue.clone());

        let mut canvas = Canvas::new();
        canvas.set_pinned(settings.start_pinned);

        Self {
            canvas,
            watches,
            reloads,
            loader,
            queue,
            inbox,
            next_position: FIRST_IMAGE_POSITION,
            should_exit: false,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Handle for queueing work from other threads
    pub fn sender(&self) -> Sender<UiMessage> {
        self.queue.clone()
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    /// Place the launch arguments, cascading from the first slot
    pub fn open_startup_images(&mut self, paths: &[PathBuf]) {
        for path in paths {
            self.open_at_next_position(path);
        }
        self.sync_watches();
    }

    /// Run the event loop until input ends or the user quits
    pub fn run(&mut self) {
        info!("Starting event loop");
        while !self.should_exit() {
            match self.inbox.recv() {
                Ok(message) => self.handle(message),
                // Unreachable while we hold `queue`, but never spin on it
                Err(_) => break,
            }
        }
        info!("Exiting application");
    }

    /// Process one queued message
    pub fn handle(&mut self, message: UiMessage) {
        match message {
            UiMessage::Command(command) => {
                if let Some(output) = self.execute(command) {
                    println!("{}", output);
                }
            }
            UiMessage::FileChanged(change) => self.on_file_changed(&change, Instant::now()),
            UiMessage::ReloadFinished { id, path, loaded } => {
                self.on_reload_finished(id, &path, loaded)
            }
            UiMessage::Shutdown => self.should_exit = true,
        }
        self.sync_watches();
    }

    /// Apply one command to the canvas, returning any text to show
    pub fn execute(&mut self, command: Command) -> Option<String> {
        match command {
            Command::Add { path, position } => {
                if !is_image_file(&path) {
                    warn!("Not an image file: {}", path.display());
                    return None;
                }
                match position {
                    Some(position) => {
                        self.open_image(&path, position);
                    }
                    None => {
                        self.open_at_next_position(&path);
                    }
                }
            }
            Command::Drop { at, paths } => {
                let mut position = self.canvas.screen_to_canvas(at);
                for path in paths.iter().filter(|path| is_image_file(path)) {
                    self.open_image(path, position);
                    position = position.cascade(CASCADE_STEP);
                }
            }
            Command::Click { at } => match self.canvas.image_at(at) {
                Some(id) => self.canvas.select_image(Some(id)),
                None => self.canvas.deselect_all(),
            },
            Command::Select(id) => self.canvas.select_image(Some(id)),
            Command::Deselect => self.canvas.deselect_all(),
            Command::Remove(Some(id)) => {
                self.canvas.remove_image(id);
            }
            Command::Remove(None) => {
                self.canvas.remove_selected();
            }
            Command::Front(id) => self.canvas.bring_to_front(id),
            Command::Back(id) => self.canvas.send_to_back(id),
            Command::Move { id, delta } => self.canvas.move_image(id, delta),
            Command::Resize {
                id,
                corner,
                delta,
                mode,
            } => self.canvas.resize_image(id, corner, delta, mode),
            Command::Pan(delta) => self.canvas.pan(delta),
            Command::Zoom { factor, center } => self.canvas.zoom(factor, center),
            Command::Wheel { direction, center } => {
                let factor = match direction {
                    Wheel::Up => WHEEL_ZOOM_STEP,
                    Wheel::Down => 1.0 / WHEEL_ZOOM_STEP,
                };
                self.canvas.zoom(factor, center);
            }
            Command::TogglePin => self.canvas.toggle_pinned(),
            Command::Escape => {
                self.canvas.escape();
            }
            Command::Reset => {
                self.canvas.reset();
                self.next_position = FIRST_IMAGE_POSITION;
            }
            Command::List => return Some(self.render()),
            Command::Help => return Some(help_text()),
            Command::Quit => self.should_exit = true,
        }
        None
    }

    fn open_at_next_position(&mut self, path: &Path) -> Option<ImageId> {
        let position = self.next_position;
        self.next_position = position.cascade(CASCADE_STEP);
        self.open_image(path, position)
    }

    fn open_image(&mut self, path: &Path, position: Point) -> Option<ImageId> {
        match self.loader.try_load(path) {
            Some(loaded) => Some(self.canvas.add_image(loaded, position)),
            None => {
                warn!("Skipping {}: could not be loaded", path.display());
                None
            }
        }
    }

    /// Feed the canvas's image-set changes to the watch registry
    fn sync_watches(&mut self) {
        let changes = self.canvas.drain_changes();
        if let Some(watches) = self.watches.as_mut() {
            for change in &changes {
                watches.apply(change, &self.canvas);
            }
        }
    }

    fn on_file_changed(&mut self, change: &FileChange, now: Instant) {
        debug!("File {:?}: {}", change.kind, change.path.display());

        let Some(watches) = self.watches.as_mut() else {
            return;
        };
        if !watches.accept(&change.path, now) {
            return;
        }

        let targets = self.canvas.images_at_path(&change.path);
        debug!("{} image(s) to reload for {}", targets.len(), change.path.display());
        for id in targets {
            if let Some(image) = self.canvas.image(id) {
                self.reloads.schedule(id, image.file_path().to_path_buf());
            }
        }
    }

    fn on_reload_finished(&mut self, id: ImageId, path: &Path, loaded: Option<LoadedImage>) {
        let Some(loaded) = loaded else {
            warn!("Reload failed for {}, keeping previous image", path.display());
            return;
        };

        if self.canvas.apply_reload(id, loaded) {
            info!("Reloaded image {} ({})", id, path.display());
        } else {
            debug!("Image {} left the canvas before its reload finished", id);
        }
    }

    /// Text rendering of the canvas: view state, then images bottom to top
    pub fn render(&self) -> String {
        let transform = self.canvas.transform();
        let pan = transform.pan_offset();
        let selected = self
            .canvas
            .selected()
            .map_or_else(|| "none".to_string(), |image| image.id().to_string());
        let watched = self.watches.as_ref().map_or(0, |w| w.watched_directories());

        let mut out = format!(
            "zoom {:.2}  pan ({:.1}, {:.1})  pinned: {}  selected: {}  watched dirs: {}",
            transform.zoom_scale(),
            pan.x,
            pan.y,
            if self.canvas.is_pinned() { "yes" } else { "no" },
            selected,
            watched
        );

        if self.canvas.is_empty() {
            out.push_str("\n(no images)");
        }
        for image in self.canvas.images_in_paint_order() {
            let position = image.position();
            let size = image.size();
            let bitmap = image.bitmap();
            let _ = write!(
                out,
                "\n{} [{}] z={} pos ({:.1}, {:.1}) size {:.1}x{:.1} aspect {:.3} bitmap {}x{} {}",
                if image.is_selected() { "*" } else { " " },
                image.id(),
                image.z_index(),
                position.x,
                position.y,
                size.width,
                size.height,
                image.aspect_ratio(),
                bitmap.width(),
                bitmap.height(),
                image.file_path().display()
            );
        }
        out
    }
}
