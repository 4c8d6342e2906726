// Transform module
// Pan/zoom state and the screen <-> canvas coordinate mapping

use crate::geometry::{Point, Vec2};

/// Smallest allowed zoom scale
pub const MIN_ZOOM: f64 = 0.1;

/// Largest allowed zoom scale
pub const MAX_ZOOM: f64 = 10.0;

/// Zoom factor applied per mouse-wheel notch
pub const WHEEL_ZOOM_STEP: f64 = 1.15;

/// View transform: `screen = canvas * zoom_scale + pan_offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    zoom_scale: f64,
    pan_offset: Vec2,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            zoom_scale: 1.0,
            pan_offset: Vec2::ZERO,
        }
    }
}

impl Transform {
    pub fn zoom_scale(&self) -> f64 {
        self.zoom_scale
    }

    pub fn pan_offset(&self) -> Vec2 {
        self.pan_offset
    }

    /// Map a screen point into canvas space
    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        Point::ZERO + (screen - Point::ZERO - self.pan_offset) / self.zoom_scale
    }

    /// Convert a screen-space drag delta into canvas units
    pub fn screen_delta_to_canvas(&self, delta: Vec2) -> Vec2 {
        delta / self.zoom_scale
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.pan_offset = self.pan_offset + delta;
    }

    /// Zoom by `factor` keeping the canvas point under `center` stationary.
    ///
    /// The new scale is clamped to `[MIN_ZOOM, MAX_ZOOM]` and the pan is
    /// corrected by the clamped change, so at a boundary the pan can still
    /// move slightly.
    pub fn zoom(&mut self, factor: f64, center: Point) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }

        let new_scale = (self.zoom_scale * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let scale_change = new_scale / self.zoom_scale;

        let anchor = center - Point::ZERO;
        self.pan_offset = anchor - (anchor - self.pan_offset) * scale_change;
        self.zoom_scale = new_scale;
    }
}
