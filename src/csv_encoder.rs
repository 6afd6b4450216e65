// src/csv_encoder.rs

//! CSV serialization of cached glyphs.
//!
//! Layout: a header `char,byte0,...,byte{N-1}` with `N = bytes_per_glyph(size)`,
//! then one row per distinct character of the request text in order of
//! first occurrence. Byte values are decimal. Rows end in CRLF.

use crate::cache::GlyphCache;
use crate::glyph::bytes_per_glyph;
use crate::rasterizer::GlyphSource;
use anyhow::{Context, Result};
use log::debug;
use std::collections::HashSet;

/// Distinct characters of `text`, first occurrence first.
pub fn unique_chars(text: &str) -> Vec<char> {
    let mut seen = HashSet::new();
    text.chars().filter(|&ch| seen.insert(ch)).collect()
}

/// Header row for glyphs of the given canvas size.
pub fn header(size: u32) -> Vec<String> {
    std::iter::once("char".to_string())
        .chain((0..bytes_per_glyph(size)).map(|i| format!("byte{}", i)))
        .collect()
}

/// Serialize the glyphs of `text` at `size` from `cache`.
///
/// Characters with no cache entry are skipped rather than written as zero
/// rows.
pub fn encode<S: GlyphSource>(text: &str, size: u32, cache: &GlyphCache<S>) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer
        .write_record(header(size))
        .context("Failed to write CSV header")?;

    let mut rows = 0;
    for ch in unique_chars(text) {
        let Some(glyph) = cache.get(size, ch) else {
            debug!("CsvEncoder: No cache entry for {:?} at {}px, skipping", ch, size);
            continue;
        };
        let record = std::iter::once(ch.to_string())
            .chain(glyph.as_bytes().iter().map(|b| b.to_string()));
        writer
            .write_record(record)
            .with_context(|| format!("Failed to write CSV row for {:?}", ch))?;
        rows += 1;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e.error()))?;
    debug!("CsvEncoder: {} row(s), {} bytes at {}px", rows, bytes.len(), size);
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}
