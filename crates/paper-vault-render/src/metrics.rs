//! Text metrics for the standard Helvetica font.
//!
//! Widths come from the Adobe core-14 AFM for Helvetica, in 1/1000 em.
//! Characters outside printable ASCII fall back to an average width.

/// Helvetica advance widths for code points 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n..z
    334, 260, 334, 584, // {..~
];

const FALLBACK_WIDTH: u16 = 556;

/// Font bounding box top and bottom (FontBBox [-166 -225 1000 931]).
const BBOX_TOP: f32 = 931.0;
const BBOX_BOTTOM: f32 = -225.0;

/// Measured extent of a line of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    /// Advance width of the whole string.
    pub width: f32,
    /// Height of the font bounding box at this size.
    pub height: f32,
    /// Distance from the baseline down to the bottom of the bounding box.
    pub descent: f32,
}

/// Encode text the way it is drawn: one byte per character.
///
/// Characters that do not fit in a single byte are drawn as `?`.
pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Width of one encoded byte in 1/1000 em.
pub fn glyph_width(byte: u8) -> u16 {
    match byte {
        32..=126 => HELVETICA_WIDTHS[(byte - 32) as usize],
        _ => FALLBACK_WIDTH,
    }
}

/// Measure `text` set in Helvetica at `size` points.
pub fn measure(text: &str, size: f32) -> TextExtent {
    let units: u32 = encode_text(text)
        .into_iter()
        .map(|b| u32::from(glyph_width(b)))
        .sum();
    TextExtent {
        width: units as f32 * size / 1000.0,
        height: (BBOX_TOP - BBOX_BOTTOM) * size / 1000.0,
        descent: -BBOX_BOTTOM * size / 1000.0,
    }
}
