//! Zoom/pan mathematics for the canvas view.
//!
//! Screen coordinates are relative to the canvas top-left corner; the image
//! is drawn translated by `pan` and then scaled by `zoom`.

use crate::constants::{HANDLE_SIZE, MAX_ZOOM, MIN_ZOOM};
use crate::geometry::{ImageBounds, Point};

/// Pan/zoom transform state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    min_zoom: f64,
    max_zoom: f64,
    handle_size: f64,
}

impl Viewport {
    /// Create a viewport with the given zoom and pan, using default limits.
    pub fn new(zoom: f64, pan_x: f64, pan_y: f64) -> Self {
        Self {
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            pan_x,
            pan_y,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            handle_size: HANDLE_SIZE,
        }
    }

    /// Create an identity viewport (zoom=1, no pan).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Override the zoom limits. The current zoom is re-clamped. A limit
    /// that is not positive and finite falls back to its default.
    pub fn with_zoom_limits(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        self.min_zoom = if usable(min_zoom) { min_zoom } else { MIN_ZOOM };
        let max_zoom = if usable(max_zoom) { max_zoom } else { MAX_ZOOM };
        self.max_zoom = max_zoom.max(self.min_zoom);
        self.zoom = self.zoom.clamp(self.min_zoom, self.max_zoom);
        self
    }

    /// Override the on-screen handle size in pixels.
    pub fn with_handle_size(mut self, handle_size: f64) -> Self {
        self.handle_size = handle_size;
        self
    }

    /// Convert a screen point to image coordinates.
    pub fn to_image_space(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan_x) / self.zoom,
            (screen.y - self.pan_y) / self.zoom,
        )
    }

    /// Convert an image point to screen coordinates.
    pub fn to_screen_space(&self, image: Point) -> Point {
        Point::new(
            image.x * self.zoom + self.pan_x,
            image.y * self.zoom + self.pan_y,
        )
    }

    /// Apply a pan delta (screen pixels).
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Multiply the zoom by `factor`, keeping the image point under
    /// `cursor` (screen space) fixed.
    pub fn zoom_at(&mut self, cursor: Point, factor: f64) {
        let anchor = self.to_image_space(cursor);
        self.zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        self.pan_x = cursor.x - anchor.x * self.zoom;
        self.pan_y = cursor.y - anchor.y * self.zoom;
    }

    /// Wheel zoom: an exponential step from the scroll delta.
    pub fn zoom_wheel(&mut self, cursor: Point, delta_y: f64) {
        self.zoom_at(cursor, (-delta_y * 0.0015).exp());
    }

    /// Scale the image to fit the canvas and centre it.
    pub fn fit(&mut self, canvas_width: f64, canvas_height: f64, image: ImageBounds) {
        let iw = f64::from(image.width.max(1));
        let ih = f64::from(image.height.max(1));
        self.zoom = (canvas_width / iw)
            .min(canvas_height / ih)
            .clamp(self.min_zoom, self.max_zoom);
        self.pan_x = (canvas_width - iw * self.zoom) / 2.0;
        self.pan_y = (canvas_height - ih * self.zoom) / 2.0;
    }

    /// Handle hit tolerance in image pixels at the current zoom.
    pub fn handle_tolerance(&self) -> f64 {
        self.handle_size / self.zoom
    }

    /// Zoom as a whole percentage for display.
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::identity()
    }
}
