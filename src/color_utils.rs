//! Color helpers shared by the overlay renderer and the annotated export.

/// Fallback for colors that fail to parse (the line-item amber).
pub const FALLBACK_RGB: [u8; 3] = [0xF5, 0x9E, 0x0B];

/// Parse `#RRGGBB` or `#RGB` (leading `#` optional).
pub fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.trim().trim_start_matches('#');
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match digits.len() {
        6 => {
            let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
            let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
            let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
            Some([r, g, b])
        }
        3 => {
            let mut rgb = [0u8; 3];
            for (slot, c) in rgb.iter_mut().zip(digits.chars()) {
                let v = c.to_digit(16)? as u8;
                *slot = v * 17;
            }
            Some(rgb)
        }
        _ => None,
    }
}

/// Parse a hex color, falling back to [`FALLBACK_RGB`].
pub fn hex_or_fallback(hex: &str) -> [u8; 3] {
    parse_hex_color(hex).unwrap_or_else(|| {
        log::warn!("Unparseable color '{}', using fallback", hex);
        FALLBACK_RGB
    })
}

/// Source-over blend of `src` at `alpha` onto `dst`.
pub fn blend(dst: [u8; 3], src: [u8; 3], alpha: f32) -> [u8; 3] {
    let a = alpha.clamp(0.0, 1.0);
    let mut out = [0u8; 3];
    for i in 0..3 {
        let v = src[i] as f32 * a + dst[i] as f32 * (1.0 - a);
        out[i] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}
