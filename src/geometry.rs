// Geometry module
// Plain value types for canvas coordinates and the corner-resize math

use std::ops::{Add, AddAssign, Div, Mul, Sub};

/// Minimum width and height of a placed image, in canvas units
pub const MIN_IMAGE_SIZE: f64 = 50.0;

/// A point in either screen or canvas space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset the point by the same amount on both axes
    pub fn cascade(self, step: f64) -> Self {
        Self::new(self.x + step, self.y + step)
    }
}

/// A displacement in either screen or canvas space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add<Vec2> for Point {
    type Output = Point;

    fn add(self, rhs: Vec2) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign<Vec2> for Point {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Vec2;

    fn sub(self, rhs: Point) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vec2 {
    type Output = Vec2;

    fn div(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

/// Width and height in canvas units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle anchored at its top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// Whether the point lies inside the rectangle (edges inclusive)
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.x <= self.origin.x + self.size.width
            && point.y >= self.origin.y
            && point.y <= self.origin.y + self.size.height
    }
}

/// Corner handle being dragged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    fn moves_left_edge(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::BottomLeft)
    }

    fn moves_top_edge(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::TopRight)
    }
}

/// Scale mode for resizing, chosen by the host's modifier key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    /// Free scaling (stretch)
    #[default]
    Free,
    /// Keep aspect ratio, width drives height
    KeepAspectRatio,
}

/// Resize `bounds` by dragging `corner` by `delta` (canvas units).
///
/// The corner opposite the dragged one stays fixed. Both dimensions of the
/// result are at least [`MIN_IMAGE_SIZE`].
pub fn resize_from_corner(
    bounds: Rect,
    corner: Corner,
    delta: Vec2,
    aspect_ratio: f64,
    mode: ResizeMode,
) -> Rect {
    let Size { width, height } = bounds.size;

    let proposed_width = if corner.moves_left_edge() {
        width - delta.x
    } else {
        width + delta.x
    };
    let proposed_height = if corner.moves_top_edge() {
        height - delta.y
    } else {
        height + delta.y
    };

    let keep_ratio =
        mode == ResizeMode::KeepAspectRatio && aspect_ratio.is_finite() && aspect_ratio > 0.0;

    let (new_width, new_height) = if keep_ratio {
        // Tall images need a wider floor so the derived height stays above the minimum
        let width_floor = MIN_IMAGE_SIZE.max(MIN_IMAGE_SIZE * aspect_ratio);
        let new_width = proposed_width.max(width_floor);
        // Division can land an ulp under the floor for wide images
        (new_width, (new_width / aspect_ratio).max(MIN_IMAGE_SIZE))
    } else {
        (
            proposed_width.max(MIN_IMAGE_SIZE),
            proposed_height.max(MIN_IMAGE_SIZE),
        )
    };

    let mut origin = bounds.origin;
    if corner.moves_left_edge() {
        origin.x += width - new_width;
    }
    if corner.moves_top_edge() {
        origin.y += height - new_height;
    }

    Rect::new(origin, Size::new(new_width, new_height))
}
