//! Glyph rasterization onto fixed-size monochrome canvases.
//!
//! `Rasterizer` turns one character into a `size` x `size` `MonoCanvas`:
//!
//! ```text
//! load face (font file, else built-in) → bounding box → shrink if it
//! overflows → center → draw
//! ```
//!
//! The font engine sits behind `FontDriver`; the rasterizer only owns the
//! layout policy.

pub mod builtin_font;
pub mod font_driver;
pub mod outline_font_driver;


use crate::glyph::MonoCanvas;
use crate::rasterizer::font_driver::{FontDriver, FontError, GlyphImage, RenderError};
use log::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Smallest pixel size the auto-shrink will go down to.
pub const MIN_SHRINK_SIZE_PX: u32 = 8;
/// Extra margin applied on top of the exact fit ratio when shrinking.
const SHRINK_MARGIN: f64 = 0.9;

/// Anything that can draw a character onto a `size` x `size` canvas.
///
/// The glyph cache is generic over this so tests can count or script renders.
pub trait GlyphSource: Send + Sync {
    fn render(&self, ch: char, size: u32) -> Result<MonoCanvas, RenderError>;
}

/// The face a render is using: the configured font, or the built-in
/// bitmap face after the font failed to load.
enum ActiveFace<F> {
    Loaded(F),
    Builtin,
}

/// Renders characters with the font at `font_path`, falling back to the
/// built-in face when it cannot be loaded.
pub struct Rasterizer<D: FontDriver> {
    driver: D,
    font_path: PathBuf,
    warned_fallback: AtomicBool,
}

impl<D: FontDriver> Rasterizer<D> {
    pub fn new(driver: D, font_path: impl Into<PathBuf>) -> Self {
        Self {
            driver,
            font_path: font_path.into(),
            warned_fallback: AtomicBool::new(false),
        }
    }

    pub fn font_path(&self) -> &Path {
        &self.font_path
    }

    /// Render `ch` centered on a fresh `size` x `size` canvas.
    pub fn render_glyph(&self, ch: char, size: u32) -> Result<MonoCanvas, RenderError> {
        let mut face = match self.driver.load_face(&self.font_path, size) {
            Ok(face) => ActiveFace::Loaded(face),
            Err(e) => {
                self.note_fallback(&e);
                ActiveFace::Builtin
            }
        };
        let mut image = self.rasterize(&face, ch)?;

        if image.overflows(size) {
            let shrunk_px = shrink_size(size, &image);
            debug!(
                "Rasterizer: '{}' is {}x{} on a {}px canvas, retrying at {}px",
                ch, image.width, image.height, size, shrunk_px
            );
            match self.driver.load_face(&self.font_path, shrunk_px) {
                Ok(shrunk) => face = ActiveFace::Loaded(shrunk),
                Err(e) => debug!("Rasterizer: Keeping original face, reload failed: {}", e),
            }
            image = self.rasterize(&face, ch)?;
        }

        let mut canvas = MonoCanvas::new(size);
        let (x, y) = centering_offset(size, &image);
        draw(&mut canvas, &image, x, y);
        trace!(
            "Rasterizer: '{}' @ {}px drawn at ({}, {}), {} pixels lit",
            ch,
            size,
            x,
            y,
            canvas.lit_pixels()
        );
        Ok(canvas)
    }

    fn rasterize(&self, face: &ActiveFace<D::Face>, ch: char) -> Result<GlyphImage, RenderError> {
        match face {
            ActiveFace::Loaded(face) => self.driver.rasterize(face, ch),
            ActiveFace::Builtin => builtin_font::rasterize(ch),
        }
    }

    fn note_fallback(&self, error: &FontError) {
        if !self.warned_fallback.swap(true, Ordering::Relaxed) {
            warn!(
                "Rasterizer: {}. Falling back to the built-in 8x8 face; non-ASCII characters will render blank.",
                error
            );
        } else {
            trace!("Rasterizer: Using built-in face: {}", error);
        }
    }
}

impl<D: FontDriver> GlyphSource for Rasterizer<D> {
    fn render(&self, ch: char, size: u32) -> Result<MonoCanvas, RenderError> {
        self.render_glyph(ch, size)
    }
}

/// Pixel size to retry with when `image` overflows a `size` canvas.
pub fn shrink_size(size: u32, image: &GlyphImage) -> u32 {
    let size_f = f64::from(size);
    let fit_w = size_f / image.width.max(1) as f64;
    let fit_h = size_f / image.height.max(1) as f64;
    let scale = fit_w.min(fit_h) * SHRINK_MARGIN;
    ((size_f * scale).floor() as u32).max(MIN_SHRINK_SIZE_PX)
}

/// Drawing origin that centers `image`'s bounding box on the canvas.
/// Floor division, so oversized glyphs get negative offsets and are clipped.
pub fn centering_offset(size: u32, image: &GlyphImage) -> (i32, i32) {
    let size = size as i32;
    let x = (size - image.width as i32).div_euclid(2) - image.left;
    let y = (size - image.height as i32).div_euclid(2) - image.top;
    (x, y)
}

fn draw(canvas: &mut MonoCanvas, image: &GlyphImage, origin_x: i32, origin_y: i32) {
    for gy in 0..image.height {
        for gx in 0..image.width {
            if image.is_inked(gx, gy) {
                canvas.set(
                    origin_x + image.left + gx as i32,
                    origin_y + image.top + gy as i32,
                );
            }
        }
    }
}
