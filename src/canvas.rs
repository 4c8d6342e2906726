// Canvas state module
// Owns the placed images, their stacking order, the selection and the view transform

use crate::geometry::{resize_from_corner, Corner, Point, Rect, ResizeMode, Size, Vec2};
use crate::image_loader::{Bitmap, LoadedImage};
use crate::transform::Transform;
use crate::watch::path_key;
use log::{debug, info};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Width cap for a freshly added image, in canvas units
pub const MAX_INITIAL_WIDTH: f64 = 400.0;

/// Stable handle of a placed image.
///
/// Allocated from a process-wide counter and never reused, so a handle held
/// after removal simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageId(u64);

static IMAGE_COUNTER: AtomicU64 = AtomicU64::new(1);

impl ImageId {
    fn next() -> Self {
        Self(IMAGE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ImageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// A single image placed on the canvas
#[derive(Debug)]
pub struct CanvasImage {
    id: ImageId,
    file_path: PathBuf,
    position: Point,
    size: Size,
    aspect_ratio: f64,
    z_index: i64,
    is_selected: bool,
    bitmap: Bitmap,
}

impl CanvasImage {
    fn new(loaded: LoadedImage, position: Point, z_index: i64) -> Self {
        let aspect_ratio = loaded.aspect_ratio();
        let width = loaded.original_width().min(MAX_INITIAL_WIDTH);
        let file_path = loaded.path().to_path_buf();

        Self {
            id: ImageId::next(),
            file_path,
            position,
            size: Size::new(width, width / aspect_ratio),
            aspect_ratio,
            z_index,
            is_selected: false,
            bitmap: loaded.into_bitmap(),
        }
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.position, self.size)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn z_index(&self) -> i64 {
        self.z_index
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }
}

/// Image-set change recorded by a canvas operation
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasChange {
    Added { id: ImageId, path: PathBuf },
    Removed { id: ImageId, path: PathBuf },
    Cleared,
}

/// The whole canvas: images, z-order, selection, pan/zoom and window mode.
///
/// Operations on ids that are not on the canvas are no-ops. Every change to
/// the image set is queued as a [`CanvasChange`] until drained.
#[derive(Debug, Default)]
pub struct Canvas {
    images: Vec<CanvasImage>,
    transform: Transform,
    selected: Option<ImageId>,
    next_z_index: i64,
    pinned: bool,
    changes: Vec<CanvasChange>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    // Read access

    pub fn images(&self) -> &[CanvasImage] {
        &self.images
    }

    /// Images sorted by ascending z-index (bottom first)
    pub fn images_in_paint_order(&self) -> Vec<&CanvasImage> {
        let mut ordered: Vec<&CanvasImage> = self.images.iter().collect();
        ordered.sort_by_key(|image| image.z_index);
        ordered
    }

    pub fn image(&self, id: ImageId) -> Option<&CanvasImage> {
        self.images.iter().find(|image| image.id == id)
    }

    fn image_mut(&mut self, id: ImageId) -> Option<&mut CanvasImage> {
        self.images.iter_mut().find(|image| image.id == id)
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.image(id).is_some()
    }

    pub fn selected(&self) -> Option<&CanvasImage> {
        self.selected.and_then(|id| self.image(id))
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Ids of all images backed by `path`, compared case-insensitively
    pub fn images_at_path(&self, path: &Path) -> Vec<ImageId> {
        let key = path_key(path);
        self.images
            .iter()
            .filter(|image| path_key(&image.file_path) == key)
            .map(|image| image.id)
            .collect()
    }

    /// Whether any image's file lives directly in `directory`
    pub fn has_image_in_directory(&self, directory: &Path) -> bool {
        let key = path_key(directory);
        self.images.iter().any(|image| {
            image
                .file_path
                .parent()
                .is_some_and(|parent| path_key(parent) == key)
        })
    }

    /// Topmost image under a screen-space point
    pub fn image_at(&self, screen: Point) -> Option<ImageId> {
        let point = self.transform.screen_to_canvas(screen);
        self.images
            .iter()
            .filter(|image| image.bounds().contains(point))
            .max_by_key(|image| image.z_index)
            .map(|image| image.id)
    }

    /// Take the image-set changes recorded since the last call
    pub fn drain_changes(&mut self) -> Vec<CanvasChange> {
        std::mem::take(&mut self.changes)
    }

    // Image set

    /// Place a decoded image at `position` (canvas space) and select it
    pub fn add_image(&mut self, loaded: LoadedImage, position: Point) -> ImageId {
        let z_index = self.allocate_z_index();
        let image = CanvasImage::new(loaded, position, z_index);
        let id = image.id;

        info!(
            "Added image {} ({}) at ({:.1}, {:.1}), {:.0}x{:.0}",
            id,
            image.file_path.display(),
            position.x,
            position.y,
            image.size.width,
            image.size.height
        );

        self.changes.push(CanvasChange::Added {
            id,
            path: image.file_path.clone(),
        });
        self.images.push(image);

        // Already holds the newest z-index, so no second raise
        self.mark_selected(Some(id));
        id
    }

    pub fn remove_image(&mut self, id: ImageId) -> bool {
        let Some(index) = self.images.iter().position(|image| image.id == id) else {
            return false;
        };

        let image = self.images.remove(index);
        if self.selected == Some(id) {
            self.selected = None;
        }

        info!("Removed image {} ({})", id, image.file_path.display());
        self.changes.push(CanvasChange::Removed {
            id,
            path: image.file_path,
        });
        true
    }

    pub fn remove_selected(&mut self) -> bool {
        match self.selected {
            Some(id) => self.remove_image(id),
            None => false,
        }
    }

    /// Remove every image and restore the default view
    pub fn reset(&mut self) {
        let count = self.images.len();
        self.images.clear();
        self.selected = None;
        self.next_z_index = 0;
        self.transform = Transform::default();
        self.changes.push(CanvasChange::Cleared);
        info!("Canvas reset ({} images removed)", count);
    }

    // Selection and stacking

    /// Select `id` and raise it to the top, or clear the selection with `None`.
    ///
    /// An id that is not on the canvas leaves the selection untouched.
    pub fn select_image(&mut self, id: Option<ImageId>) {
        if let Some(id) = id {
            if !self.contains(id) {
                debug!("Ignoring selection of unknown image {}", id);
                return;
            }
        }

        self.mark_selected(id);
        if let Some(id) = id {
            self.bring_to_front(id);
        }
    }

    pub fn deselect_all(&mut self) {
        self.mark_selected(None);
    }

    fn mark_selected(&mut self, id: Option<ImageId>) {
        if let Some(previous) = self.selected.take() {
            if let Some(image) = self.image_mut(previous) {
                image.is_selected = false;
            }
        }

        if let Some(id) = id {
            if let Some(image) = self.image_mut(id) {
                image.is_selected = true;
                self.selected = Some(id);
            }
        }
    }

    pub fn bring_to_front(&mut self, id: ImageId) {
        if !self.contains(id) {
            return;
        }
        let z_index = self.allocate_z_index();
        if let Some(image) = self.image_mut(id) {
            image.z_index = z_index;
        }
    }

    /// Move `id` one below the current lowest z-index.
    ///
    /// Does not touch the front counter, so repeated use drifts negative.
    pub fn send_to_back(&mut self, id: ImageId) {
        let Some(min_z) = self.images.iter().map(|image| image.z_index).min() else {
            return;
        };
        if let Some(image) = self.image_mut(id) {
            image.z_index = min_z - 1;
        }
    }

    fn allocate_z_index(&mut self) -> i64 {
        let z_index = self.next_z_index;
        self.next_z_index += 1;
        z_index
    }

    // Layout

    /// Drag an image by a screen-space delta
    pub fn move_image(&mut self, id: ImageId, screen_delta: Vec2) {
        let delta = self.transform.screen_delta_to_canvas(screen_delta);
        if let Some(image) = self.image_mut(id) {
            image.position += delta;
        }
    }

    /// Resize an image by dragging one of its corners by a screen-space delta
    pub fn resize_image(&mut self, id: ImageId, corner: Corner, screen_delta: Vec2, mode: ResizeMode) {
        let delta = self.transform.screen_delta_to_canvas(screen_delta);
        if let Some(image) = self.image_mut(id) {
            let bounds = resize_from_corner(image.bounds(), corner, delta, image.aspect_ratio, mode);
            image.position = bounds.origin;
            image.size = bounds.size;
        }
    }

    // View

    pub fn pan(&mut self, screen_delta: Vec2) {
        self.transform.pan(screen_delta);
    }

    pub fn zoom(&mut self, factor: f64, center: Point) {
        self.transform.zoom(factor, center);
    }

    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        self.transform.screen_to_canvas(screen)
    }

    // Window mode

    pub fn set_pinned(&mut self, pinned: bool) {
        if self.pinned != pinned {
            self.pinned = pinned;
            info!("Pinned mode: {}", if pinned { "on" } else { "off" });
        }
    }

    pub fn toggle_pinned(&mut self) {
        self.set_pinned(!self.pinned);
    }

    /// Escape leaves pinned mode; returns whether the key was consumed
    pub fn escape(&mut self) -> bool {
        if self.pinned {
            self.set_pinned(false);
            true
        } else {
            false
        }
    }

    // Reload

    /// Swap in a freshly decoded bitmap, keeping layout, stacking and selection.
    ///
    /// Returns `false` when the image has left the canvas meanwhile.
    pub fn apply_reload(&mut self, id: ImageId, loaded: LoadedImage) -> bool {
        let Some(image) = self.image_mut(id) else {
            return false;
        };
        image.aspect_ratio = loaded.aspect_ratio();
        image.bitmap = loaded.into_bitmap();
        true
    }
}
