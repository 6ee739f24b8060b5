//! Global constants for the invoice annotator

/// Handle square size in screen pixels
pub const HANDLE_SIZE: f64 = 6.0;

/// Boxes smaller than this (either side, image pixels) are not committed
pub const MIN_BOX_SIZE: i32 = 2;

/// Default undo history depth
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// Image width assumed when no page image is loaded
pub const DEFAULT_IMAGE_WIDTH: u32 = 1000;

/// Image height assumed when no page image is loaded
pub const DEFAULT_IMAGE_HEIGHT: u32 = 1400;

/// Zoom limits for the canvas view
pub const MIN_ZOOM: f64 = 0.2;
pub const MAX_ZOOM: f64 = 6.0;

/// File name used when no image has been loaded
pub const DEFAULT_IMAGE_NAME: &str = "image.png";
