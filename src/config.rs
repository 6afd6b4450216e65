// src/config.rs

//! Defines the configuration structures for the glyph CSV service.
//!
//! The structs deserialize from a JSON file and fall back to defaults that
//! match the service's original constants: the Noto Sans TC font next to the
//! binary, 16px glyphs by default, and a catalog of 16, 24 and 32px canvases.

use anyhow::{Context, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a JSON config file.
pub const CONFIG_PATH_ENV: &str = "FONT_CSV_CONFIG";
/// Environment variable overriding `glyphs.font_path`.
pub const FONT_PATH_ENV: &str = "FONT_CSV_FONT_PATH";
/// Environment variable overriding `server.bind_address`.
pub const BIND_ADDRESS_ENV: &str = "FONT_CSV_BIND";

/// Process-wide configuration, resolved on first access.
pub static CONFIG: Lazy<Config> = Lazy::new(Config::load_or_default);

// --- Top-Level Configuration Structure ---

/// Represents the complete configuration for the service.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Font asset and canvas size settings.
    pub glyphs: GlyphConfig,
}

impl Config {
    /// Reads a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }

    /// Resolves the configuration from `FONT_CSV_CONFIG` (if set) and the
    /// single-value environment overrides. Never fails; a broken config file
    /// is logged and replaced by defaults.
    pub fn load_or_default() -> Self {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                match Self::load(&path) {
                    Ok(config) => {
                        info!("Config: Loaded {}", path.display());
                        config
                    }
                    Err(e) => {
                        warn!("Config: {:#}. Using defaults.", e);
                        Config::default()
                    }
                }
            }
            None => Config::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Applies single-value overrides looked up through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(font_path) = lookup(FONT_PATH_ENV) {
            self.glyphs.font_path = PathBuf::from(font_path);
        }
        if let Some(bind) = lookup(BIND_ADDRESS_ENV) {
            self.server.bind_address = bind;
        }
    }
}

// --- Server Configuration ---

/// Settings for the HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind_address: String,
    /// Number of threads pulling requests off the listener.
    pub worker_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "0.0.0.0:5000".to_string(),
            worker_threads: 4,
        }
    }
}

// --- Glyph Configuration ---

/// Font asset and canvas size settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlyphConfig {
    /// Path to the scalable font used for rendering.
    pub font_path: PathBuf,
    /// Canvas size used when the request omits `size` or asks for one
    /// outside `allowed_sizes`.
    pub default_size: u32,
    /// Canvas sizes clients may request.
    pub allowed_sizes: Vec<u32>,
}

impl Default for GlyphConfig {
    fn default() -> Self {
        GlyphConfig {
            font_path: PathBuf::from("NotoSansTC-Regular.ttf"),
            default_size: 16,
            allowed_sizes: vec![16, 24, 32],
        }
    }
}

/// The fixed set of canvas sizes the service renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeCatalog {
    allowed: Vec<u32>,
    default_size: u32,
}

impl SizeCatalog {
    pub fn new(allowed: Vec<u32>, default_size: u32) -> Self {
        Self {
            allowed,
            default_size,
        }
    }

    pub fn default_size(&self) -> u32 {
        self.default_size
    }

    pub fn sizes(&self) -> &[u32] {
        &self.allowed
    }

    pub fn contains(&self, size: u32) -> bool {
        self.allowed.contains(&size)
    }

    /// Maps a requested size onto the catalog. Absent or unsupported sizes
    /// (negative and oversized integers included) become the default size.
    pub fn coerce(&self, requested: Option<i64>) -> u32 {
        requested
            .and_then(|size| u32::try_from(size).ok())
            .filter(|size| self.contains(*size))
            .unwrap_or(self.default_size)
    }
}

impl From<&GlyphConfig> for SizeCatalog {
    fn from(config: &GlyphConfig) -> Self {
        SizeCatalog::new(config.allowed_sizes.clone(), config.default_size)
    }
}

impl Default for SizeCatalog {
    fn default() -> Self {
        SizeCatalog::from(&GlyphConfig::default())
    }
}
