// src/glyph.rs

//! Defines the glyph data model: the `GlyphKey` cache identity, the packed
//! 1-bit-per-pixel `PackedGlyph`, and the `MonoCanvas` the rasterizer draws
//! into before packing.

use std::fmt;
use std::sync::Arc;

/// Number of bytes in a packed glyph of the given canvas size:
/// `ceil(size / 8)` bytes per row, `size` rows.
pub fn bytes_per_glyph(size: u32) -> usize {
    let size = size as usize;
    size.div_ceil(8) * size
}

/// Identifies one cache entry: a character rendered on a `size` x `size` canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    pub size: u32,
    pub ch: char,
}

impl GlyphKey {
    pub const fn new(size: u32, ch: char) -> Self {
        Self { size, ch }
    }
}

impl fmt::Display for GlyphKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' (U+{:04X}) @ {}px", self.ch, self.ch as u32, self.size)
    }
}

/// A glyph flattened to row-major, MSB-first, 8-pixels-per-byte form.
///
/// Always `bytes_per_glyph(size)` bytes long. Cloning is cheap; the bytes
/// are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedGlyph(Arc<[u8]>);

impl PackedGlyph {
    /// All-zero glyph used when a character cannot be rendered.
    pub fn blank(size: u32) -> Self {
        Self(vec![0u8; bytes_per_glyph(size)].into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when no pixel is on.
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl From<Vec<u8>> for PackedGlyph {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

/// A square monochrome canvas. Pixels start off; out-of-bounds writes are
/// clipped and out-of-bounds reads are off.
#[derive(Clone, PartialEq, Eq)]
pub struct MonoCanvas {
    size: usize,
    pixels: Vec<bool>,
}

impl MonoCanvas {
    pub fn new(size: u32) -> Self {
        let size = size as usize;
        Self {
            size,
            pixels: vec![false; size * size],
        }
    }

    pub fn size(&self) -> u32 {
        self.size as u32
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size && self.pixels[y * self.size + x]
    }

    /// Sets the pixel at signed coordinates, ignoring anything off-canvas.
    pub fn set(&mut self, x: i32, y: i32) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x < self.size && y < self.size {
            self.pixels[y * self.size + x] = true;
        }
    }

    pub fn lit_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }
}

impl fmt::Debug for MonoCanvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MonoCanvas {}x{}", self.size, self.size)?;
        for row in self.pixels.chunks(self.size.max(1)) {
            let line: String = row.iter().map(|&p| if p { '#' } else { '.' }).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
