// Configuration module
// Runtime settings resolved from the command line

use crate::cli::ParsedArgs;
use crate::geometry::Point;
use std::time::Duration;

/// Window in which repeated change notifications for one file are dropped
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Delay between a change notification and re-reading the file
pub const DEFAULT_RELOAD_GRACE_MS: u64 = 100;

/// Canvas position of the first image opened without an explicit position
pub const FIRST_IMAGE_POSITION: Point = Point::new(20.0, 20.0);

/// Offset between consecutively opened or dropped images
pub const CASCADE_STEP: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub debounce: Duration,
    pub reload_grace: Duration,
    /// Reload images when their files change on disk
    pub watch_files: bool,
    /// Start in always-on-top, borderless mode
    pub start_pinned: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            reload_grace: Duration::from_millis(DEFAULT_RELOAD_GRACE_MS),
            watch_files: true,
            start_pinned: false,
        }
    }
}

impl From<&ParsedArgs> for Settings {
    fn from(args: &ParsedArgs) -> Self {
        Self {
            debounce: Duration::from_millis(args.debounce_ms),
            reload_grace: Duration::from_millis(args.grace_ms),
            watch_files: args.watch_files,
            start_pinned: args.pinned,
        }
    }
}
