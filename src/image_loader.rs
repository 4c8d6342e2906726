// Image loading module
// Decodes image files from disk into bitmaps for the canvas

use anyhow::{bail, Context, Result};
use image::DynamicImage;
use log::{debug, warn};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Extensions accepted on the canvas (compared case-insensitively)
const SUPPORTED_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "bmp", "gif", "webp", "tiff", "tif"];

/// Decoded pixel data for one image
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    /// Image width in pixels
    width: u32,
    /// Image height in pixels
    height: u32,
    /// Raw RGBA pixel data (4 bytes per pixel)
    rgba_data: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, rgba_data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            rgba_data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[allow(dead_code)]
    pub fn rgba_data(&self) -> &[u8] {
        &self.rgba_data
    }
}

/// A successfully decoded image file
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    path: PathBuf,
    bitmap: Bitmap,
}

impl LoadedImage {
    pub fn new(path: PathBuf, bitmap: Bitmap) -> Self {
        Self { path, bitmap }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_width(&self) -> f64 {
        self.bitmap.width as f64
    }

    pub fn original_height(&self) -> f64 {
        self.bitmap.height as f64
    }

    /// `original_width / original_height`
    pub fn aspect_ratio(&self) -> f64 {
        self.original_width() / self.original_height()
    }

    pub fn into_bitmap(self) -> Bitmap {
        self.bitmap
    }
}

/// Source of decoded images.
///
/// Failures never cross this boundary as errors: a missing or undecodable
/// file yields `None`.
pub trait ImageLoader: Send + Sync {
    fn try_load(&self, path: &Path) -> Option<LoadedImage>;
}

/// Whether the path carries one of the supported image extensions
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Loads images from the local filesystem with the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskLoader;

impl ImageLoader for DiskLoader {
    fn try_load(&self, path: &Path) -> Option<LoadedImage> {
        if !path.is_file() {
            debug!("Not loading {}: no such file", path.display());
            return None;
        }

        match load_image(path) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Failed to load {}: {:#}", path.display(), e);
                None
            }
        }
    }
}

/// Read, decode and convert one image file to RGBA
fn load_image(path: &Path) -> Result<LoadedImage> {
    let data = fs::read(path)
        .with_context(|| format!("Failed to read image file: {}", path.display()))?;
    let img = load_from_bytes(&data)?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        bail!("Image has no pixels ({}x{})", width, height);
    }

    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    Ok(LoadedImage::new(
        absolute,
        Bitmap::new(width, height, rgba.into_raw()),
    ))
}

/// Load an image from raw bytes, auto-detecting the format
fn load_from_bytes(data: &[u8]) -> Result<DynamicImage> {
    // Try to guess the format from the data
    let format = image::guess_format(data).context("Failed to detect image format")?;

    let cursor = Cursor::new(data);
    let img = image::load(cursor, format).context("Failed to decode image")?;

    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scratch_dir;

    #[test]
    fn recognises_supported_extensions_case_insensitively() {
        for name in [
            "a.png", "b.JPG", "c.jpeg", "d.Bmp", "e.gif", "f.webp", "g.TIFF", "h.tif",
        ] {
            assert!(is_image_file(Path::new(name)), "{name}");
        }
    }

    #[test]
    fn rejects_other_paths() {
        for name in ["notes.txt", "archive.png.zip", "png", "dir/", "image.ico", ""] {
            assert!(!is_image_file(Path::new(name)), "{name}");
        }
    }

    #[test]
    fn disk_loader_decodes_png() {
        let dir = scratch_dir("disk-loader-png");
        let path = dir.join("wide.png");
        image::RgbaImage::from_pixel(8, 4, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let loaded = DiskLoader.try_load(&path).expect("png should load");
        assert_eq!(loaded.original_width(), 8.0);
        assert_eq!(loaded.original_height(), 4.0);
        assert_eq!(loaded.aspect_ratio(), 2.0);
        assert!(loaded.path().is_absolute());
        let bitmap = loaded.into_bitmap();
        assert_eq!(bitmap.rgba_data().len(), 8 * 4 * 4);
        assert_eq!(&bitmap.rgba_data()[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn disk_loader_returns_none_for_missing_file() {
        let dir = scratch_dir("disk-loader-missing");
        assert!(DiskLoader.try_load(&dir.join("absent.png")).is_none());
    }

    #[test]
    fn disk_loader_returns_none_for_corrupt_bytes() {
        let dir = scratch_dir("disk-loader-corrupt");
        let path = dir.join("broken.png");
        fs::write(&path, b"definitely not a png").unwrap();
        assert!(DiskLoader.try_load(&path).is_none());
    }
}
