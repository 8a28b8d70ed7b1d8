//! Slide rasterisation: `Slide` + `Palette` → 1920×1080 PNG.
//!
//! ## Layout
//!
//! A flat background, the title at (100, 100) in 60 px type, and one line per
//! bullet from (150, 250) at 80 px intervals in 40 px type, each prefixed with
//! `"• "`. Text is not wrapped; overlong lines run off the right edge.
//!
//! ## Why spawn_blocking?
//!
//! Glyph rasterisation and PNG compression are CPU-bound. They run on the
//! blocking pool and are awaited immediately, keeping slides strictly in order
//! without stalling the runtime's worker threads.

use crate::error::{LectureError, Stage};
use crate::output::Slide;
use crate::pipeline::font::SlideFont;
use crate::pipeline::palette::Palette;
use image::{ImageBuffer, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub const SLIDE_WIDTH: u32 = 1920;
pub const SLIDE_HEIGHT: u32 = 1080;

const TITLE_POS: (i32, i32) = (100, 100);
const TITLE_SIZE: f32 = 60.0;
const BULLET_X: i32 = 150;
const BULLET_TOP: i32 = 250;
const BULLET_STEP: i32 = 80;
const BULLET_SIZE: f32 = 40.0;

/// Draw `slide` with `palette` onto a fresh canvas.
pub fn render_slide(slide: &Slide, palette: &Palette, font: &SlideFont) -> RgbImage {
    let mut img: RgbImage = ImageBuffer::from_pixel(SLIDE_WIDTH, SLIDE_HEIGHT, palette.background);

    font.draw(
        &mut img,
        palette.title,
        TITLE_POS.0,
        TITLE_POS.1,
        TITLE_SIZE,
        &slide.title,
    );

    for (i, point) in slide.bullet_points.iter().enumerate() {
        let y = BULLET_TOP + i as i32 * BULLET_STEP;
        if y >= SLIDE_HEIGHT as i32 {
            break;
        }
        font.draw(
            &mut img,
            palette.text,
            BULLET_X,
            y,
            BULLET_SIZE,
            &format!("• {point}"),
        );
    }
    img
}

/// `slide_{n}.png` (1-based) in `dir`.
pub fn slide_image_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("slide_{}.png", index + 1))
}

/// Render slide `index` (0-based) and save it as PNG in `dir`.
pub async fn render_slide_to_file(
    slide: &Slide,
    index: usize,
    font: Arc<SlideFont>,
    dir: &Path,
) -> Result<PathBuf, LectureError> {
    let slide = slide.clone();
    let path = slide_image_path(dir, index);
    let out = path.clone();

    tokio::task::spawn_blocking(move || {
        let palette = Palette::for_slide(index);
        debug!("Rendering slide {} with palette '{}'", index + 1, palette.name);
        render_slide(&slide, palette, &font)
            .save(&out)
            .map_err(|e| LectureError::RenderFailed {
                slide: index + 1,
                path: out.clone(),
                detail: e.to_string(),
            })
    })
    .await
    .map_err(|e| LectureError::internal(Stage::Render, format!("Render task panicked: {}", e)))??;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::palette::PALETTES;

    fn slide(title: &str, bullets: usize) -> Slide {
        Slide {
            title: title.into(),
            bullet_points: (0..bullets).map(|i| format!("Point {}", i + 1)).collect(),
            teaching_script: "Script.".into(),
        }
    }

    #[test]
    fn canvas_is_full_hd_with_palette_background() {
        for index in [0usize, 10, 23] {
            let palette = Palette::for_slide(index);
            let img = render_slide(&slide("Gravity", 3), palette, &SlideFont::Bitmap);
            assert_eq!(img.dimensions(), (1920, 1080));
            // Corners are never covered by text.
            assert_eq!(*img.get_pixel(0, 0), palette.background);
            assert_eq!(*img.get_pixel(1919, 1079), palette.background);
        }
        let img = render_slide(&slide("x", 0), Palette::for_slide(23), &SlideFont::Bitmap);
        assert_eq!(*img.get_pixel(5, 5), PALETTES[3].background);
    }

    #[test]
    fn title_and_bullets_use_their_colours() {
        let palette = Palette::for_slide(1);
        let img = render_slide(&slide("TITLE", 2), palette, &SlideFont::Bitmap);

        let title_band = (100..170)
            .flat_map(|y| (100..700).map(move |x| (x, y)))
            .filter(|&(x, y)| *img.get_pixel(x, y) == palette.title)
            .count();
        assert!(title_band > 0, "title not drawn");

        let bullet_band = (250..300)
            .flat_map(|y| (150..700).map(move |x| (x, y)))
            .filter(|&(x, y)| *img.get_pixel(x, y) == palette.text)
            .count();
        assert!(bullet_band > 0, "bullet not drawn");
    }

    #[test]
    fn many_bullets_stop_at_the_bottom_edge() {
        let img = render_slide(&slide("Long", 40), Palette::for_slide(0), &SlideFont::Bitmap);
        assert_eq!(img.height(), 1080);
    }

    #[tokio::test]
    async fn writes_png_named_by_slide_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = render_slide_to_file(&slide("Gravity", 1), 2, Arc::new(SlideFont::Bitmap), dir.path())
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("slide_3.png"));
        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(*decoded.get_pixel(0, 0), PALETTES[2].background);
    }

    #[tokio::test]
    async fn unwritable_directory_is_a_render_error() {
        let err = render_slide_to_file(
            &slide("Gravity", 1),
            0,
            Arc::new(SlideFont::Bitmap),
            Path::new("/definitely/not/a/dir"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LectureError::RenderFailed { slide: 1, .. }));
    }
}
