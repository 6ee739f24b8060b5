//! Box geometry in image space.
//!
//! Everything here is a pure function over integer pixel boxes and
//! floating-point pointer positions: normalization of dragged rectangles,
//! clamping to the image, resize handles and the move/resize transforms.

use serde::{Deserialize, Serialize};

/// A pointer position in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise difference `self - other`.
    pub fn delta_from(&self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// Pixel dimensions of the page image; the authoritative clamp region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBounds {
    pub width: u32,
    pub height: u32,
}

impl ImageBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn w(&self) -> i64 {
        i64::from(self.width)
    }

    fn h(&self) -> i64 {
        i64::from(self.height)
    }
}

/// An integer axis-aligned box, serialized as `[x, y, w, h]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl From<[i32; 4]> for BBox {
    fn from([x, y, w, h]: [i32; 4]) -> Self {
        Self { x, y, w, h }
    }
}

impl From<BBox> for [i32; 4] {
    fn from(b: BBox) -> Self {
        [b.x, b.y, b.w, b.h]
    }
}

impl BBox {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge, saturating at `i32::MAX`.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.w)
    }

    /// Bottom edge, saturating at `i32::MAX`.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.h)
    }

    /// Positive extents and edges that fit in `i32`.
    pub fn is_well_formed(&self) -> bool {
        self.w > 0
            && self.h > 0
            && self.x.checked_add(self.w).is_some()
            && self.y.checked_add(self.h).is_some()
    }

    /// Area in square pixels.
    pub fn area(&self) -> i64 {
        i64::from(self.w) * i64::from(self.h)
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= f64::from(self.x)
            && p.y >= f64::from(self.y)
            && p.x <= f64::from(self.right())
            && p.y <= f64::from(self.bottom())
    }

    /// Whether the box has positive extents and lies inside the image.
    pub fn is_within(&self, bounds: ImageBounds) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.w >= 1
            && self.h >= 1
            && i64::from(self.x) + i64::from(self.w) <= bounds.w()
            && i64::from(self.y) + i64::from(self.h) <= bounds.h()
    }
}

fn round_px(v: f64) -> i32 {
    v.round() as i32
}

/// Turn a dragged rectangle (possibly with negative extents) into a box
/// with its origin at the top-left, rounded to whole pixels.
pub fn normalize(mut x: f64, mut y: f64, mut w: f64, mut h: f64) -> BBox {
    if w < 0.0 {
        x += w;
        w = -w;
    }
    if h < 0.0 {
        y += h;
        h = -h;
    }
    BBox::new(round_px(x), round_px(y), round_px(w), round_px(h))
}

/// Normalized box spanned by two corner points.
pub fn from_corners(a: Point, b: Point) -> BBox {
    normalize(a.x, a.y, b.x - a.x, b.y - a.y)
}

/// Clip a box so it lies inside the image. Extents may shrink to zero.
pub fn clamp_to_image(b: BBox, bounds: ImageBounds) -> BBox {
    let x = i64::from(b.x).clamp(0, bounds.w());
    let y = i64::from(b.y).clamp(0, bounds.h());
    let w = i64::from(b.w).clamp(0, bounds.w() - x);
    let h = i64::from(b.h).clamp(0, bounds.h() - y);
    BBox::new(x as i32, y as i32, w as i32, h as i32)
}

/// One of the eight resize handles of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    NW,
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
}

impl Handle {
    /// Hit-test order: corners first, then edge midpoints.
    pub const HIT_ORDER: [Handle; 8] = [
        Handle::NW,
        Handle::NE,
        Handle::SE,
        Handle::SW,
        Handle::N,
        Handle::E,
        Handle::S,
        Handle::W,
    ];

    /// Short name (`"nw"`, `"e"`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Handle::NW => "nw",
            Handle::N => "n",
            Handle::NE => "ne",
            Handle::E => "e",
            Handle::SE => "se",
            Handle::S => "s",
            Handle::SW => "sw",
            Handle::W => "w",
        }
    }

    /// CSS-style cursor hint for hosts that show one.
    pub fn cursor(&self) -> &'static str {
        match self {
            Handle::NW | Handle::SE => "nwse-resize",
            Handle::NE | Handle::SW => "nesw-resize",
            Handle::N | Handle::S => "ns-resize",
            Handle::E | Handle::W => "ew-resize",
        }
    }

    fn moves_north(&self) -> bool {
        matches!(self, Handle::NW | Handle::N | Handle::NE)
    }

    fn moves_south(&self) -> bool {
        matches!(self, Handle::SW | Handle::S | Handle::SE)
    }

    fn moves_west(&self) -> bool {
        matches!(self, Handle::NW | Handle::W | Handle::SW)
    }

    fn moves_east(&self) -> bool {
        matches!(self, Handle::NE | Handle::E | Handle::SE)
    }

    /// Anchor point of this handle on `b`.
    pub fn anchor(&self, b: BBox) -> Point {
        let x0 = f64::from(b.x);
        let y0 = f64::from(b.y);
        let x1 = f64::from(b.right());
        let y1 = f64::from(b.bottom());
        let xm = x0 + f64::from(b.w) / 2.0;
        let ym = y0 + f64::from(b.h) / 2.0;
        match self {
            Handle::NW => Point::new(x0, y0),
            Handle::N => Point::new(xm, y0),
            Handle::NE => Point::new(x1, y0),
            Handle::E => Point::new(x1, ym),
            Handle::SE => Point::new(x1, y1),
            Handle::S => Point::new(xm, y1),
            Handle::SW => Point::new(x0, y1),
            Handle::W => Point::new(x0, ym),
        }
    }
}

/// First handle (in [`Handle::HIT_ORDER`]) whose anchor is within
/// `tolerance` of `p` on both axes.
pub fn hit_test_handle(b: BBox, p: Point, tolerance: f64) -> Option<Handle> {
    Handle::HIT_ORDER.into_iter().find(|handle| {
        let anchor = handle.anchor(b);
        (p.x - anchor.x).abs() <= tolerance && (p.y - anchor.y).abs() <= tolerance
    })
}

/// Drag the edge(s) named by `handle` to `p`, keeping the opposite edges
/// fixed. Extents never drop below one pixel and the result stays inside
/// the image.
pub fn resize(b: BBox, handle: Handle, p: Point, bounds: ImageBounds) -> BBox {
    // Work on whole-pixel edges so the fixed ones never move
    let mut x0 = i64::from(b.x);
    let mut y0 = i64::from(b.y);
    let mut x1 = x0 + i64::from(b.w);
    let mut y1 = y0 + i64::from(b.h);

    if handle.moves_north() {
        y0 = round_edge(p.y).min(y1 - 1);
    }
    if handle.moves_south() {
        y1 = round_edge(p.y).max(y0 + 1);
    }
    if handle.moves_west() {
        x0 = round_edge(p.x).min(x1 - 1);
    }
    if handle.moves_east() {
        x1 = round_edge(p.x).max(x0 + 1);
    }

    let (x0, x1) = clamp_span(x0, x1, bounds.w());
    let (y0, y1) = clamp_span(y0, y1, bounds.h());
    BBox::new(x0 as i32, y0 as i32, (x1 - x0) as i32, (y1 - y0) as i32)
}

fn round_edge(v: f64) -> i64 {
    v.round() as i64
}

/// Clamp both edges of a span into `[0, limit]`, keeping at least one pixel.
fn clamp_span(start: i64, end: i64, limit: i64) -> (i64, i64) {
    let start = start.clamp(0, (limit - 1).max(0));
    let end = end.clamp(start + 1, limit.max(start + 1));
    (start, end)
}

/// Translate `b` by `delta`, clamping only its position so the whole box
/// stays inside the image.
pub fn move_by(b: BBox, delta: Point, bounds: ImageBounds) -> BBox {
    let x = i64::from(round_px(f64::from(b.x) + delta.x));
    let y = i64::from(round_px(f64::from(b.y) + delta.y));
    let x = x.min(bounds.w() - i64::from(b.w)).max(0);
    let y = y.min(bounds.h() - i64::from(b.h)).max(0);
    BBox::new(x as i32, y as i32, b.w, b.h)
}
