// src/packer.rs

//! Bit packing for 1-bit displays.
//!
//! Rows are walked top to bottom; each row is cut into groups of 8 columns
//! and every group becomes one byte, leftmost pixel in the most significant
//! bit. A row whose width is not a multiple of 8 ends in a zero-padded byte.

use crate::glyph::{bytes_per_glyph, MonoCanvas, PackedGlyph};

/// Packs the top-left `size` x `size` region of `canvas`.
///
/// Pixels outside the canvas read as off, so the result is always
/// `bytes_per_glyph(size)` bytes long.
pub fn pack(canvas: &MonoCanvas, size: u32) -> PackedGlyph {
    let size = size as usize;
    let mut bytes = Vec::with_capacity(bytes_per_glyph(size as u32));

    for py in 0..size {
        for px_start in (0..size).step_by(8) {
            let mut byte = 0u8;
            for bit in 0..8 {
                let px = px_start + bit;
                if px < size && canvas.get(px, py) {
                    byte |= 1 << (7 - bit);
                }
            }
            bytes.push(byte);
        }
    }

    PackedGlyph::from(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(size: u32) -> MonoCanvas {
        let mut canvas = MonoCanvas::new(size);
        for y in 0..size as i32 {
            for x in 0..size as i32 {
                canvas.set(x, y);
            }
        }
        canvas
    }

    #[test]
    fn test_length_for_catalog_sizes() {
        for size in [16, 24, 32] {
            assert_eq!(pack(&MonoCanvas::new(size), size).len(), bytes_per_glyph(size));
            assert_eq!(pack(&filled(size), size).len(), bytes_per_glyph(size));
        }
    }

    #[test]
    fn test_msb_first() {
        let mut canvas = MonoCanvas::new(16);
        canvas.set(0, 0);
        canvas.set(9, 0);
        canvas.set(15, 1);
        let packed = pack(&canvas, 16);
        let bytes = packed.as_bytes();
        assert_eq!(bytes[0], 0b1000_0000);
        assert_eq!(bytes[1], 0b0100_0000);
        assert_eq!(bytes[2], 0);
        assert_eq!(bytes[3], 0b0000_0001);
        assert!(bytes[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_partial_trailing_byte_is_zero_padded() {
        let packed = pack(&filled(12), 12);
        assert_eq!(packed.len(), 24);
        for row in packed.as_bytes().chunks(2) {
            assert_eq!(row, &[0xFF, 0xF0]);
        }
    }

    #[test]
    fn test_smaller_canvas_pads_with_zeros() {
        // A canvas smaller than the requested size still packs to full length.
        let packed = pack(&filled(8), 16);
        assert_eq!(packed.len(), 32);
        assert_eq!(&packed.as_bytes()[..2], &[0xFF, 0x00]);
        assert!(packed.as_bytes()[16..].iter().all(|&b| b == 0));
    }
}
