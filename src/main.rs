// In src/main.rs

// Declare modules
pub mod cache;
pub mod config;
pub mod csv_encoder;
pub mod glyph;
pub mod packer;
pub mod rasterizer;
pub mod server;

use crate::{
    cache::GlyphCache,
    config::{SizeCatalog, CONFIG, FONT_PATH_ENV},
    rasterizer::{outline_font_driver::OutlineFontDriver, Rasterizer},
    server::FontService,
};

// Logging
use anyhow::Context;
use log::{error, info};
use std::sync::Arc;

/// Main entry point for the `font-csv` service.
fn main() -> anyhow::Result<()> {
    // Initialize the logger. Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting font-csv...");
    let config = &*CONFIG;
    info!("Configuration: {:?}", config);

    // --- Font asset check ---
    // A missing font is not fatal; glyphs fall back to the built-in face.
    let font_path = &config.glyphs.font_path;
    if font_path.exists() {
        info!("Font file OK: {}", font_path.display());
    } else {
        error!("==================================================");
        error!("Font file not found: {}", font_path.display());
        error!("Download NotoSansTC-Regular.ttf into the working directory");
        error!("or point {} at a font file.", FONT_PATH_ENV);
        error!("Rendering will use the built-in ASCII face until then.");
        error!("==================================================");
    }

    // --- Core components ---
    let rasterizer = Rasterizer::new(OutlineFontDriver::new(), font_path.clone());
    info!("Rasterizer initialized with {}", rasterizer.font_path().display());
    let cache = GlyphCache::new(rasterizer);
    let sizes = SizeCatalog::from(&config.glyphs);
    info!(
        "Glyph cache ready. Sizes {:?}, default {}px",
        sizes.sizes(),
        sizes.default_size()
    );
    let service = Arc::new(FontService::new(cache, sizes));

    info!(
        "Try: http://{}/font.csv?text=測試&size=16",
        config.server.bind_address
    );
    server::http::serve(service, &config.server).context("HTTP server failed")?;

    info!("font-csv exited.");
    Ok(())
}
