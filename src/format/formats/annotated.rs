//! Annotated page image: the page with box overlays burned in, as PNG.
//!
//! Boxes and label pills are rasterized with `tiny-skia`; label text is
//! drawn glyph by glyph with `ab_glyph` from a system font.

use std::io::Cursor;
use std::sync::OnceLock;

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use image::{ImageFormat, Rgb, RgbImage};
use tiny_skia::{
    FillRule, IntSize, Paint, Path, PathBuilder, Pixmap, PremultipliedColorU8, Rect, Stroke,
    Transform,
};

use crate::color_utils::{blend, hex_or_fallback};
use crate::format::error::FormatError;
use crate::format::traits::{ExportData, ExportFormat, ExportResult, FormatWarning};
use crate::geometry::BBox;

/// Background used when no page image is loaded.
pub const BLANK_BACKGROUND: [u8; 3] = [0x0D, 0x12, 0x25];

/// Fill behind label text.
pub const PILL_BACKGROUND: [u8; 3] = [0x0A, 0x0F, 0x1F];

/// Opacity of box fills.
pub const FILL_ALPHA: f32 = 0.12;

const LABEL_FONT_PX: f32 = 12.0;
const PILL_HEIGHT: f32 = 16.0;
const PILL_PAD_X: f32 = 6.0;
/// Distance from the box top to the pill top.
const PILL_RISE: f32 = 12.0;
/// Advance used to size pills when no font could be loaded.
const FALLBACK_ADVANCE: f32 = 7.2;

/// Fonts tried in order for label text.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/Carlito-Regular.ttf",
    "/System/Library/Fonts/Menlo.ttc",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:\\Windows\\Fonts\\consola.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static LABEL_FONT: OnceLock<Option<FontArc>> = OnceLock::new();

/// Font for label pills, loaded once. `None` when no candidate loads; pills
/// are then drawn without text.
pub fn label_font() -> Option<&'static FontArc> {
    LABEL_FONT.get_or_init(load_label_font).as_ref()
}

fn load_label_font() -> Option<FontArc> {
    for path in FONT_CANDIDATES {
        let Ok(bytes) = std::fs::read(path) else {
            continue;
        };
        match FontArc::try_from_vec(bytes) {
            Ok(font) => {
                log::debug!("🔤 Label font: {}", path);
                return Some(font);
            }
            Err(e) => log::warn!("Unreadable font {}: {}", path, e),
        }
    }
    log::warn!("No system font found, label pills will have no text");
    None
}

/// Annotated PNG export.
///
/// Fills, borders and label pills follow the display toggles. The selected
/// box gets a two-pixel border.
pub struct AnnotatedImageFormat;

impl AnnotatedImageFormat {
    /// Draw every annotation onto a copy of the page (or a blank canvas).
    pub fn render(data: &ExportData<'_>) -> Result<RgbImage, FormatError> {
        let mut pixmap = page_pixmap(data)?;
        let font = if data.display.labels {
            label_font()
        } else {
            None
        };

        for ann in data.annotations {
            let color = hex_or_fallback(&ann.group_color);
            if data.display.fills {
                fill_box(&mut pixmap, ann.bbox, color);
            }
            if data.display.borders {
                let width = if data.selected == Some(ann.id) { 2.0 } else { 1.0 };
                stroke_box(&mut pixmap, ann.bbox, color, width);
            }
            if data.display.labels {
                let x = ann.bbox.x as f32;
                let y = ann.bbox.y as f32 - PILL_RISE;
                draw_label_pill(&mut pixmap, font, &ann.label.to_string(), x, y, color);
            }
        }

        into_rgb(pixmap)
    }
}

impl ExportFormat for AnnotatedImageFormat {
    fn id(&self) -> &'static str {
        "annotated"
    }

    fn display_name(&self) -> &'static str {
        "Annotated image (PNG)"
    }

    fn suffix(&self) -> &'static str {
        "-annotated.png"
    }

    fn export_to_bytes(
        &self,
        data: &ExportData<'_>,
    ) -> Result<(Vec<u8>, ExportResult), FormatError> {
        let mut result = ExportResult::with_count(data.annotations.len());
        if data.image.is_none() {
            result.add_warning(FormatWarning::warning(
                "No page image loaded, drawing onto a blank canvas",
            ));
        }
        if data.display.labels && !data.annotations.is_empty() && label_font().is_none() {
            result.add_warning(FormatWarning::info("No font available, label text omitted"));
        }

        let canvas = Self::render(data)?;
        let mut bytes = Vec::new();
        canvas.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok((bytes, result))
    }
}

/// Opaque RGBA pixmap of the page, or of a blank canvas the size of the
/// image bounds.
fn page_pixmap(data: &ExportData<'_>) -> Result<Pixmap, FormatError> {
    let page = match data.image {
        Some(image) => image.to_rgb8(),
        None => RgbImage::from_pixel(
            data.bounds.width.max(1),
            data.bounds.height.max(1),
            Rgb(BLANK_BACKGROUND),
        ),
    };
    let (width, height) = page.dimensions();
    let canvas_error = || FormatError::Canvas { width, height };

    let rgba: Vec<u8> = page
        .pixels()
        .flat_map(|Rgb([r, g, b])| [*r, *g, *b, u8::MAX])
        .collect();
    let size = IntSize::from_wh(width, height).ok_or_else(canvas_error)?;
    Pixmap::from_vec(rgba, size).ok_or_else(canvas_error)
}

fn into_rgb(pixmap: Pixmap) -> Result<RgbImage, FormatError> {
    let (width, height) = (pixmap.width(), pixmap.height());
    // Every pixel is opaque, so premultiplied and straight channels agree
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    RgbImage::from_raw(width, height, rgb).ok_or(FormatError::Canvas { width, height })
}

fn solid(color: [u8; 3], alpha: u8, anti_alias: bool) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], alpha);
    paint.anti_alias = anti_alias;
    paint
}

fn fill_box(pixmap: &mut Pixmap, bbox: BBox, color: [u8; 3]) {
    let Some(rect) = Rect::from_xywh(
        bbox.x as f32,
        bbox.y as f32,
        bbox.w as f32,
        bbox.h as f32,
    ) else {
        return;
    };
    let alpha = (FILL_ALPHA * 255.0).round() as u8;
    pixmap.fill_rect(rect, &solid(color, alpha, false), Transform::identity(), None);
}

/// Stroke just inside the box so the border covers its outermost pixels.
fn stroke_box(pixmap: &mut Pixmap, bbox: BBox, color: [u8; 3], width: f32) {
    let paint = solid(color, u8::MAX, false);
    let inner = Rect::from_xywh(
        bbox.x as f32 + width / 2.0,
        bbox.y as f32 + width / 2.0,
        bbox.w as f32 - width,
        bbox.h as f32 - width,
    );
    let Some(inner) = inner.filter(|r| r.width() > 0.0 && r.height() > 0.0) else {
        // Too thin to outline; paint it solid
        if let Some(rect) =
            Rect::from_xywh(bbox.x as f32, bbox.y as f32, bbox.w as f32, bbox.h as f32)
        {
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
        return;
    };

    let stroke = Stroke {
        width,
        ..Stroke::default()
    };
    let path = PathBuilder::from_rect(inner);
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

fn draw_label_pill(
    pixmap: &mut Pixmap,
    font: Option<&FontArc>,
    text: &str,
    x: f32,
    y: f32,
    color: [u8; 3],
) {
    let text_width = match font {
        Some(font) => {
            let scaled = font.as_scaled(PxScale::from(LABEL_FONT_PX));
            text.chars()
                .map(|c| scaled.h_advance(scaled.glyph_id(c)))
                .sum()
        }
        None => text.chars().count() as f32 * FALLBACK_ADVANCE,
    };
    let width = text_width + PILL_PAD_X * 2.0;

    let Some(path) = rounded_rect(x, y, width, PILL_HEIGHT, PILL_HEIGHT / 2.0) else {
        return;
    };
    pixmap.fill_path(
        &path,
        &solid(PILL_BACKGROUND, u8::MAX, true),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
    pixmap.stroke_path(
        &path,
        &solid(color, u8::MAX, true),
        &Stroke::default(),
        Transform::identity(),
        None,
    );

    if let Some(font) = font {
        draw_text(pixmap, font, text, x + PILL_PAD_X, y + LABEL_FONT_PX, color);
    }
}

fn rounded_rect(x: f32, y: f32, w: f32, h: f32, radius: f32) -> Option<Path> {
    let r = radius.min(w / 2.0).min(h / 2.0);
    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(x + w - r, y);
    pb.quad_to(x + w, y, x + w, y + r);
    pb.line_to(x + w, y + h - r);
    pb.quad_to(x + w, y + h, x + w - r, y + h);
    pb.line_to(x + r, y + h);
    pb.quad_to(x, y + h, x, y + h - r);
    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);
    pb.close();
    pb.finish()
}

/// Rasterize `text` with its baseline at `baseline`, blending glyph
/// coverage over what is already on the canvas.
fn draw_text(
    pixmap: &mut Pixmap,
    font: &FontArc,
    text: &str,
    x: f32,
    baseline: f32,
    color: [u8; 3],
) {
    let scale = PxScale::from(LABEL_FONT_PX);
    let scaled = font.as_scaled(scale);
    let width = pixmap.width() as i64;
    let height = pixmap.height() as i64;
    let pixels = pixmap.pixels_mut();

    let mut caret = x;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let origin = outlined.px_bounds().min;
        outlined.draw(|gx, gy, coverage| {
            let px = origin.x as i64 + i64::from(gx);
            let py = origin.y as i64 + i64::from(gy);
            if px < 0 || py < 0 || px >= width || py >= height {
                return;
            }
            let slot = &mut pixels[(py * width + px) as usize];
            let [r, g, b] = blend([slot.red(), slot.green(), slot.blue()], color, coverage);
            if let Some(blended) = PremultipliedColorU8::from_rgba(r, g, b, u8::MAX) {
                *slot = blended;
            }
        });
    }
}
