//! Scalable font driver backed by `fontdue`.

use crate::rasterizer::font_driver::{FontDriver, FontError, GlyphImage, RenderError};
use fontdue::{Font, FontSettings};
use log::*;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Coverage at or above this value is an "on" pixel.
const INK_THRESHOLD: u8 = 128;

/// A parsed font scaled to one pixel size.
#[derive(Clone)]
pub struct OutlineFace {
    font: Arc<Font>,
    px: f32,
}

/// Loads TrueType/OpenType fonts from disk and rasterizes glyphs with them.
///
/// Parsed fonts are memoised per path. Failed loads are not, so a font that
/// appears on disk later is picked up on the next load.
#[derive(Default)]
pub struct OutlineFontDriver {
    fonts: RwLock<HashMap<PathBuf, Arc<Font>>>,
}

impl OutlineFontDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn font(&self, path: &Path) -> Result<Arc<Font>, FontError> {
        if let Some(font) = self
            .fonts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return Ok(Arc::clone(font));
        }

        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FontError::Missing(path.to_path_buf()),
            _ => FontError::Unreadable(path.to_path_buf(), e),
        })?;
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|reason| FontError::Invalid(path.to_path_buf(), reason.to_string()))?;
        info!(
            "OutlineFontDriver: Parsed '{}' ({} glyphs)",
            path.display(),
            font.glyph_count()
        );

        let mut fonts = self.fonts.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            fonts.entry(path.to_path_buf()).or_insert_with(|| Arc::new(font)),
        ))
    }
}

impl FontDriver for OutlineFontDriver {
    type Face = OutlineFace;

    fn load_face(&self, path: &Path, size_px: u32) -> Result<OutlineFace, FontError> {
        let font = self.font(path)?;
        Ok(OutlineFace {
            font,
            px: size_px as f32,
        })
    }

    fn rasterize(&self, face: &OutlineFace, ch: char) -> Result<GlyphImage, RenderError> {
        if face.font.lookup_glyph_index(ch) == 0 {
            return Err(RenderError::GlyphMissing(ch));
        }

        let (metrics, coverage) = face.font.rasterize(ch, face.px);
        if coverage.len() != metrics.width * metrics.height {
            return Err(RenderError::Internal(format!(
                "bitmap for '{}' is {} bytes, expected {}x{}",
                ch,
                coverage.len(),
                metrics.width,
                metrics.height
            )));
        }

        // fontdue measures ymin up from the baseline; the canvas origin is
        // the ascender line with y growing down.
        let ascent = face
            .font
            .horizontal_line_metrics(face.px)
            .map(|line| line.ascent)
            .unwrap_or(face.px);
        let top = ascent.round() as i32 - (metrics.ymin + metrics.height as i32);

        trace!(
            "OutlineFontDriver: '{}' @ {}px -> {}x{} at ({}, {})",
            ch,
            face.px,
            metrics.width,
            metrics.height,
            metrics.xmin,
            top
        );

        Ok(GlyphImage {
            left: metrics.xmin,
            top,
            width: metrics.width,
            height: metrics.height,
            ink: coverage.iter().map(|&c| c >= INK_THRESHOLD).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::MonoCanvas;
    use crate::packer;
    use crate::rasterizer::Rasterizer;
    use test_log::test;

    /// Latin-only fonts commonly installed on Linux and macOS hosts.
    const SYSTEM_FONTS: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
    ];

    fn system_font() -> Option<PathBuf> {
        let found = SYSTEM_FONTS.iter().map(PathBuf::from).find(|p| p.exists());
        if found.is_none() {
            warn!("No Latin system font installed, skipping outline font test");
        }
        found
    }

    fn ascent(face: &OutlineFace) -> i32 {
        face.font
            .horizontal_line_metrics(face.px)
            .map(|line| line.ascent.round() as i32)
            .unwrap()
    }

    fn lit_bounds(canvas: &MonoCanvas) -> (usize, usize, usize, usize) {
        let size = canvas.size() as usize;
        let lit: Vec<(usize, usize)> = (0..size)
            .flat_map(|y| (0..size).map(move |x| (x, y)))
            .filter(|&(x, y)| canvas.get(x, y))
            .collect();
        let xs = lit.iter().map(|&(x, _)| x);
        let ys = lit.iter().map(|&(_, y)| y);
        (
            xs.clone().min().unwrap(),
            ys.clone().min().unwrap(),
            xs.max().unwrap(),
            ys.max().unwrap(),
        )
    }

    #[test]
    fn test_capital_sits_on_the_baseline() {
        let Some(path) = system_font() else { return };
        let driver = OutlineFontDriver::new();
        let face = driver.load_face(&path, 16).unwrap();

        let image = driver.rasterize(&face, 'A').unwrap();
        assert!(image.ink.contains(&true));
        assert!(!image.overflows(16));
        // Top is measured down from the ascender line; 'A' ends at the baseline.
        assert!(image.top > 0);
        assert!(image.top + image.height as i32 <= ascent(&face));
    }

    #[test]
    fn test_descender_reaches_below_the_baseline() {
        let Some(path) = system_font() else { return };
        let driver = OutlineFontDriver::new();
        let face = driver.load_face(&path, 24).unwrap();

        let image = driver.rasterize(&face, 'g').unwrap();
        assert!(image.top + image.height as i32 > ascent(&face));
    }

    #[test]
    fn test_ink_is_coverage_at_threshold() {
        let Some(path) = system_font() else { return };
        let driver = OutlineFontDriver::new();
        let face = driver.load_face(&path, 24).unwrap();

        let image = driver.rasterize(&face, '@').unwrap();
        let (_, coverage) = face.font.rasterize('@', face.px);
        let expected: Vec<bool> = coverage.iter().map(|&c| c >= 128).collect();
        assert_eq!(image.ink, expected);

        // Anti-aliased edges below the threshold stay off.
        let touched = coverage.iter().filter(|&&c| c > 0).count();
        let inked = image.ink.iter().filter(|&&on| on).count();
        assert!(inked > 0);
        assert!(inked < touched);
    }

    #[test]
    fn test_space_has_no_ink() {
        let Some(path) = system_font() else { return };
        let driver = OutlineFontDriver::new();
        let face = driver.load_face(&path, 16).unwrap();

        let image = driver.rasterize(&face, ' ').unwrap();
        assert!(!image.ink.contains(&true));
    }

    #[test]
    fn test_cjk_is_missing_from_latin_font() {
        let Some(path) = system_font() else { return };
        let driver = OutlineFontDriver::new();
        let face = driver.load_face(&path, 16).unwrap();

        assert_eq!(
            driver.rasterize(&face, '你').map(|_| ()),
            Err(RenderError::GlyphMissing('你'))
        );
    }

    #[test]
    fn test_font_is_parsed_once_per_path() {
        let Some(path) = system_font() else { return };
        let driver = OutlineFontDriver::new();
        let small = driver.load_face(&path, 16).unwrap();
        let large = driver.load_face(&path, 32).unwrap();

        assert!(Arc::ptr_eq(&small.font, &large.font));
        assert_eq!(driver.fonts.read().unwrap().len(), 1);
    }

    #[test]
    fn test_rendered_glyphs_are_centered_and_packed() {
        let Some(path) = system_font() else { return };
        let rasterizer = Rasterizer::new(OutlineFontDriver::new(), path);

        for (size, packed_len) in [(16, 32), (24, 72), (32, 128)] {
            let canvas = rasterizer.render_glyph('A', size).unwrap();
            let (x0, y0, x1, y1) = lit_bounds(&canvas);
            let last = size as usize - 1;
            // Coverage thresholding can trim a pixel off either edge.
            assert!(x0.abs_diff(last - x1) <= 2, "{}px: x {}..{}", size, x0, x1);
            assert!(y0.abs_diff(last - y1) <= 2, "{}px: y {}..{}", size, y0, y1);

            let packed = packer::pack(&canvas, size);
            assert_eq!(packed.len(), packed_len);
            assert!(!packed.is_blank());
        }
    }

    #[test]
    fn test_wide_and_tall_glyphs_still_render() {
        let Some(path) = system_font() else { return };
        let rasterizer = Rasterizer::new(OutlineFontDriver::new(), path);

        for ch in ['W', '@', '\u{2588}'] {
            let canvas = rasterizer.render_glyph(ch, 16).unwrap();
            assert!(canvas.lit_pixels() > 0, "'{}' rendered blank", ch);
        }
        assert_eq!(
            rasterizer.render_glyph('你', 16),
            Err(RenderError::GlyphMissing('你'))
        );
    }

    #[test]
    fn test_missing_font_file() {
        let driver = OutlineFontDriver::new();
        let result = driver.load_face(Path::new("/no/such/dir/NotoSansTC-Regular.ttf"), 16);
        assert!(matches!(result, Err(FontError::Missing(_))));
    }

    #[test]
    fn test_invalid_font_file() {
        let path = std::env::temp_dir().join(format!(
            "font-csv-invalid-{}.ttf",
            std::process::id()
        ));
        std::fs::write(&path, b"this is not a font").unwrap();

        let driver = OutlineFontDriver::new();
        let result = driver.load_face(&path, 16);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(FontError::Invalid(_, _))));
    }
}
