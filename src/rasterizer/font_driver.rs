//! Font loading and single-glyph rasterization primitives.
//!
//! This module defines the `FontDriver` trait, the seam between the
//! rasterizer's layout logic (shrink, centering) and a concrete font engine.
//! The errors here are values: a `FontError` means "use the built-in face",
//! a `RenderError` means "this glyph cannot be drawn, emit a placeholder".

use std::fmt;
use std::path::{Path, PathBuf};

/// Font engine trait.
///
/// Implementors provide:
/// - Loading a face from a font file at a pixel size
/// - Rasterizing one character of a loaded face to a monochrome image
pub trait FontDriver: Send + Sync {
    /// Engine-specific handle for a face loaded at one size.
    type Face;

    /// Load the font at `path` scaled to `size_px`.
    fn load_face(&self, path: &Path, size_px: u32) -> Result<Self::Face, FontError>;

    /// Rasterize `ch` with `face`.
    ///
    /// # Returns
    /// The glyph's ink bitmap and its bounding box relative to the drawing
    /// origin, or `RenderError::GlyphMissing` if the face has no glyph for `ch`.
    fn rasterize(&self, face: &Self::Face, ch: char) -> Result<GlyphImage, RenderError>;
}

/// A rasterized glyph: its bounding box relative to the drawing origin
/// (top-left text anchor) and a row-major `width * height` ink mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphImage {
    pub left: i32,
    pub top: i32,
    pub width: usize,
    pub height: usize,
    pub ink: Vec<bool>,
}

impl GlyphImage {
    /// An image with no ink, e.g. for whitespace.
    pub fn empty() -> Self {
        Self {
            left: 0,
            top: 0,
            width: 0,
            height: 0,
            ink: Vec::new(),
        }
    }

    pub fn is_inked(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.ink[y * self.width + x]
    }

    /// True when the bounding box does not fit a `size` x `size` canvas.
    pub fn overflows(&self, size: u32) -> bool {
        self.width > size as usize || self.height > size as usize
    }
}

/// Why a face could not be loaded.
#[derive(Debug)]
pub enum FontError {
    /// No file at the configured path.
    Missing(PathBuf),
    /// The file exists but could not be read.
    Unreadable(PathBuf, std::io::Error),
    /// The font engine rejected the file contents.
    Invalid(PathBuf, String),
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontError::Missing(path) => write!(f, "font file '{}' not found", path.display()),
            FontError::Unreadable(path, e) => {
                write!(f, "font file '{}' unreadable: {}", path.display(), e)
            }
            FontError::Invalid(path, reason) => {
                write!(f, "font file '{}' invalid: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for FontError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FontError::Unreadable(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Why a single glyph could not be rendered. The caller substitutes a blank
/// glyph; the request carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The active face has no glyph for this character. It is cached as a
    /// blank glyph; the font's `.notdef` box is deliberately never drawn.
    GlyphMissing(char),
    /// The font engine reported an inconsistency.
    Internal(String),
    /// The font engine panicked while rendering this character.
    Panicked(char),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::GlyphMissing(ch) => {
                write!(f, "no glyph for '{}' (U+{:04X})", ch, *ch as u32)
            }
            RenderError::Internal(reason) => write!(f, "font engine error: {}", reason),
            RenderError::Panicked(ch) => {
                write!(f, "font engine panicked on '{}' (U+{:04X})", ch, *ch as u32)
            }
        }
    }
}

impl std::error::Error for RenderError {}
