// src/cache.rs

//! Process-lifetime memoisation of packed glyphs.
//!
//! `GlyphCache` maps `(size, char)` to the packed bytes for that glyph. It
//! only grows; `clear` is the single way entries leave. A character that
//! fails to render is cached as a blank glyph so one bad character never
//! fails a request, and it stays blank until the cache is cleared.

use crate::glyph::{GlyphKey, PackedGlyph};
use crate::packer;
use crate::rasterizer::font_driver::RenderError;
use crate::rasterizer::GlyphSource;
use log::*;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Thread-safe glyph memo table that renders misses with its `GlyphSource`.
///
/// Concurrent `ensure` calls for the same key may both render it; the first
/// insert wins and the duplicate is dropped. Rendering happens with no lock
/// held.
pub struct GlyphCache<S: GlyphSource> {
    source: S,
    entries: RwLock<HashMap<GlyphKey, PackedGlyph>>,
}

impl<S: GlyphSource> GlyphCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    /// Render and store every distinct character of `text` not yet cached at
    /// `size`.
    ///
    /// # Returns
    /// How many glyphs this call rendered (0 when everything was cached).
    pub fn ensure(&self, text: &str, size: u32) -> usize {
        let missing: Vec<char> = {
            let entries = self.read();
            let mut seen = HashSet::new();
            text.chars()
                .filter(|&ch| seen.insert(ch))
                .filter(|&ch| !entries.contains_key(&GlyphKey::new(size, ch)))
                .collect()
        };
        if missing.is_empty() {
            trace!("GlyphCache: All of {:?} cached at {}px", text, size);
            return 0;
        }

        debug!(
            "GlyphCache: Rendering {} new glyph(s) at {}px",
            missing.len(),
            size
        );
        let rendered: Vec<(GlyphKey, PackedGlyph)> = missing
            .into_iter()
            .map(|ch| {
                let key = GlyphKey::new(size, ch);
                (key, self.render_one(key))
            })
            .collect();

        let count = rendered.len();
        let mut entries = self.write();
        for (key, glyph) in rendered {
            entries.entry(key).or_insert(glyph);
        }
        count
    }

    /// Packed glyph for `ch` at `size`, if cached.
    pub fn get(&self, size: u32, ch: char) -> Option<PackedGlyph> {
        self.read().get(&GlyphKey::new(size, ch)).cloned()
    }

    pub fn contains(&self, key: GlyphKey) -> bool {
        self.read().contains_key(&key)
    }

    /// Drop every entry, all sizes included.
    pub fn clear(&self) {
        let mut entries = self.write();
        let dropped = entries.len();
        entries.clear();
        info!("GlyphCache: Cleared {} entries", dropped);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Render and pack one glyph, substituting a blank glyph on failure.
    fn render_one(&self, key: GlyphKey) -> PackedGlyph {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.source.render(key.ch, key.size)
        }))
        .unwrap_or(Err(RenderError::Panicked(key.ch)));

        match outcome {
            Ok(canvas) => packer::pack(&canvas, key.size),
            Err(e) => {
                warn!("GlyphCache: Failed to render {}: {}. Storing blank glyph.", key, e);
                PackedGlyph::blank(key.size)
            }
        }
    }

    // Entries are plain data; a panic while holding the lock cannot leave
    // a half-written value, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<GlyphKey, PackedGlyph>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<GlyphKey, PackedGlyph>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::glyph::{bytes_per_glyph, MonoCanvas};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use test_log::test;

    /// Draws a diagonal for every character and counts render calls.
    /// `'?'` fails to render and `'!'` panics.
    #[derive(Default)]
    pub(crate) struct CountingSource {
        renders: AtomicUsize,
    }

    impl CountingSource {
        pub(crate) fn renders(&self) -> usize {
            self.renders.load(Ordering::SeqCst)
        }
    }

    impl GlyphSource for CountingSource {
        fn render(&self, ch: char, size: u32) -> Result<MonoCanvas, RenderError> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            match ch {
                '?' => Err(RenderError::GlyphMissing(ch)),
                '!' => panic!("font engine blew up"),
                _ => {
                    let mut canvas = MonoCanvas::new(size);
                    for i in 0..size as i32 {
                        canvas.set(i, i);
                    }
                    Ok(canvas)
                }
            }
        }
    }

    #[test]
    fn test_ensure_populates_each_character() {
        let cache = GlyphCache::new(CountingSource::default());
        assert_eq!(cache.ensure("AB", 16), 2);

        for ch in ['A', 'B'] {
            let glyph = cache.get(16, ch).unwrap();
            assert_eq!(glyph.len(), bytes_per_glyph(16));
            assert!(!glyph.is_blank());
        }
        assert_eq!(cache.get(24, 'A'), None);
    }

    #[test]
    fn test_ensure_renders_duplicates_once() {
        let cache = GlyphCache::new(CountingSource::default());
        assert_eq!(cache.ensure("banana", 16), 3);
        assert_eq!(cache.source().renders(), 3);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let cache = GlyphCache::new(CountingSource::default());
        cache.ensure("hello", 24);
        let first: Vec<_> = "helo".chars().map(|c| cache.get(24, c)).collect();

        assert_eq!(cache.ensure("hello", 24), 0);
        let second: Vec<_> = "helo".chars().map(|c| cache.get(24, c)).collect();

        assert_eq!(first, second);
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.source().renders(), 4);
    }

    #[test]
    fn test_sizes_are_separate_entries() {
        let cache = GlyphCache::new(CountingSource::default());
        cache.ensure("A", 16);
        cache.ensure("A", 32);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(16, 'A').unwrap().len(), 32);
        assert_eq!(cache.get(32, 'A').unwrap().len(), 128);
    }

    #[test]
    fn test_failed_render_stores_blank_placeholder() {
        let cache = GlyphCache::new(CountingSource::default());
        assert_eq!(cache.ensure("a?", 16), 2);

        let placeholder = cache.get(16, '?').unwrap();
        assert_eq!(placeholder, PackedGlyph::blank(16));
        assert!(!cache.get(16, 'a').unwrap().is_blank());

        // The placeholder is not retried on later requests.
        assert_eq!(cache.ensure("?", 16), 0);
        assert_eq!(cache.source().renders(), 2);
    }

    #[test]
    fn test_panicking_render_is_contained() {
        let cache = GlyphCache::new(CountingSource::default());
        assert_eq!(cache.ensure("x!y", 32), 3);
        assert_eq!(cache.get(32, '!'), Some(PackedGlyph::blank(32)));
        assert!(!cache.get(32, 'y').unwrap().is_blank());
    }

    #[test]
    fn test_clear_forces_rerender() {
        let cache = GlyphCache::new(CountingSource::default());
        cache.ensure("AB", 16);
        cache.ensure("C", 24);
        assert_eq!(cache.source().renders(), 3);

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains(GlyphKey::new(16, 'A')));

        assert_eq!(cache.ensure("AB", 16), 2);
        assert_eq!(cache.source().renders(), 5);
    }

    #[test]
    fn test_concurrent_ensure_keeps_one_entry_per_key() {
        let cache = Arc::new(GlyphCache::new(CountingSource::default()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    cache.ensure("concurrent", 16);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // c, o, n, u, r, e, t
        assert_eq!(cache.len(), 7);
        assert!(cache.source().renders() >= 7);
        for ch in "concurrent".chars() {
            assert_eq!(cache.get(16, ch).unwrap().len(), 32);
        }
    }
}
