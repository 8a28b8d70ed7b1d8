//! Fixed slide colour palettes, assigned round-robin by slide index.

use image::Rgb;

/// Background, body-text and title colours for one slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub name: &'static str,
    pub background: Rgb<u8>,
    pub text: Rgb<u8>,
    pub title: Rgb<u8>,
}

const fn rgb(hex: u32) -> Rgb<u8> {
    Rgb([(hex >> 16) as u8, (hex >> 8) as u8, hex as u8])
}

const fn palette(name: &'static str, bg: u32, text: u32, title: u32) -> Palette {
    Palette {
        name,
        background: rgb(bg),
        text: rgb(text),
        title: rgb(title),
    }
}

pub const PALETTES: [Palette; 10] = [
    palette("Academic & Warm", 0xFAF3E0, 0x4E342E, 0x800000),
    palette("Tech Dark Mode", 0x121212, 0xE0E0E0, 0xFFD700),
    palette("Clean & Minimalist", 0xFFFFFF, 0x212121, 0x008060),
    palette("Cool Slate", 0xEDF2F7, 0x2D3748, 0x2B6CB0),
    palette("Forest & Amber", 0x004D40, 0xF1F1F1, 0xF2C94C),
    palette("Earthy & Natural", 0xF4F1DE, 0x5D4037, 0x81A684),
    palette("Deep Indigo & Cyan", 0x002244, 0xFFFFFF, 0x66B2FF),
    palette("Slate & Orange", 0x34495E, 0xECF0F1, 0xF39C12),
    palette("Soft & Professional", 0xF8F9FA, 0x343A40, 0x6F42C1),
    palette("Rich Plum", 0x241B2F, 0xD1C4E9, 0x90CAF9),
];

impl Palette {
    /// Palette for slide `index` (0-based).
    pub fn for_slide(index: usize) -> &'static Palette {
        &PALETTES[index % PALETTES.len()]
    }

    /// `#RRGGBB` form of a colour, for previews.
    pub fn hex(color: Rgb<u8>) -> String {
        let [r, g, b] = color.0;
        format!("#{r:02X}{g:02X}{b:02X}")
    }
}
