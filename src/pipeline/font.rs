//! Font selection for slide text.
//!
//! A configured TrueType file wins; otherwise a short list of common system
//! fonts is searched. When none can be loaded the built-in 8×8 bitmap font is
//! scaled up instead, so rendering never fails for lack of a font.

use ab_glyph::{FontVec, PxScale};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Searched in order after the configured font.
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// font8x8 has no bullet; a filled dot in the same row-per-byte layout.
const BULLET_GLYPH: [u8; 8] = [0x00, 0x00, 0x18, 0x3C, 0x3C, 0x18, 0x00, 0x00];

/// A loaded font, outline or bitmap.
pub enum SlideFont {
    Outline { font: FontVec, source: PathBuf },
    Bitmap,
}

impl SlideFont {
    /// Try `configured`, then [`SYSTEM_FONT_CANDIDATES`], then the bitmap font.
    pub fn load(configured: Option<&Path>) -> Self {
        if let Some(path) = configured {
            match load_outline(path) {
                Some(font) => return font,
                None => warn!(
                    "Font '{}' could not be loaded; searching system fonts",
                    path.display()
                ),
            }
        }
        for candidate in SYSTEM_FONT_CANDIDATES {
            if let Some(font) = load_outline(Path::new(candidate)) {
                return font;
            }
        }
        warn!("No TrueType font found; using the built-in bitmap font");
        SlideFont::Bitmap
    }

    /// Human-readable font name for logs and environment reports.
    pub fn describe(&self) -> String {
        match self {
            SlideFont::Outline { source, .. } => source.display().to_string(),
            SlideFont::Bitmap => "built-in 8x8 bitmap".to_string(),
        }
    }

    /// Draw one line of `text` with its top-left corner at (`x`, `y`).
    pub fn draw(&self, img: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, size: f32, text: &str) {
        match self {
            SlideFont::Outline { font, .. } => {
                draw_text_mut(img, color, x, y, PxScale::from(size), font, text)
            }
            SlideFont::Bitmap => draw_bitmap_text(img, color, x, y, size, text),
        }
    }
}

fn load_outline(path: &Path) -> Option<SlideFont> {
    let bytes = std::fs::read(path).ok()?;
    match FontVec::try_from_vec(bytes) {
        Ok(font) => {
            debug!("Loaded font {}", path.display());
            Some(SlideFont::Outline {
                font,
                source: path.to_path_buf(),
            })
        }
        Err(e) => {
            debug!("{} is not a usable font: {}", path.display(), e);
            None
        }
    }
}

fn glyph_rows(ch: char) -> [u8; 8] {
    if ch == '•' {
        return BULLET_GLYPH;
    }
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Each font8x8 byte is one row; bit `n` lights column `n`.
fn draw_bitmap_text(img: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, size: f32, text: &str) {
    let cell = ((size / 8.0).round() as i32).max(1);
    let advance = cell * 8;
    for (i, ch) in text.chars().enumerate() {
        let origin_x = x + i as i32 * advance;
        if origin_x >= img.width() as i32 {
            break;
        }
        for (row, bits) in glyph_rows(ch).iter().enumerate() {
            for col in 0..8 {
                if bits & (1 << col) != 0 {
                    let rect = Rect::at(origin_x + col * cell, y + row as i32 * cell)
                        .of_size(cell as u32, cell as u32);
                    draw_filled_rect_mut(img, rect, color);
                }
            }
        }
    }
}
