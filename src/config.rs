//! Configuration management for WSI Mosaic.
//!
//! This module provides the CLI surface and run configuration:
//! - Command-line arguments via clap
//! - Environment variables with `WSIM_` prefix
//! - Sensible defaults matching the WebScope viewer conventions
//!
//! All tunables (tile side, output directory, magnification bounds) live in
//! the configuration structs handed to each component at construction; there
//! is no ambient shared state.
//!
//! # Environment Variables
//!
//! - `WSIM_TILE_SIDE` - Tile edge length in pixels (default: 250)
//! - `WSIM_OUTPUT_DIR` - Directory for rasters and encoded mosaics (default: .)
//! - `WSIM_TILES_DIR` - Directory for kept tile files (default: ./tiles)

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

// =============================================================================
// Default Values
// =============================================================================

/// Tile edge length in pixels. Constant across a run and across recycled
/// runs; the raster header records it so a mismatch is detected on reopen.
pub const DEFAULT_TILE_SIDE: u32 = 250;

/// Default width/height of the requested region in source pixels.
pub const DEFAULT_REGION_SIZE: u32 = 1000;

/// Native (maximum) magnification of the source scanner. The zoom factor is
/// derived relative to this.
pub const BASE_MAGNIFICATION: f64 = 40.0;

/// Lowest magnification the tile source supports.
pub const MIN_MAGNIFICATION: f64 = 0.2;

/// Magnification substituted when the requested value is out of range.
pub const FALLBACK_MAGNIFICATION: f64 = 1.0;

/// Default JPEG quality requested from the tile source.
pub const DEFAULT_QUALITY: u8 = 80;

/// Default directory for kept tile files.
pub const DEFAULT_TILES_DIR: &str = "./tiles";

/// File extension of the persisted raster.
pub const RASTER_EXTENSION: &str = "raster";

// =============================================================================
// CLI
// =============================================================================

/// WSI Mosaic - download and stitch a region of a Whole Slide Image.
///
/// Fetches the region tile by tile from a WebScope tile server, assembles the
/// tiles into a disk-backed raster, and encodes the result as a single image.
/// Interrupted or enlarged runs can be resumed with `--recycle`.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-mosaic")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download a region and stitch it into a mosaic.
    Fetch(FetchConfig),

    /// CAUTION: delete ALL generated artifacts - rasters, encoded mosaics
    /// and kept tile files.
    Clean(CleanConfig),
}

/// Output format for the encoded mosaic.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpg,
    Png,
    Bmp,
}

impl OutputFormat {
    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Bmp => "bmp",
        }
    }
}

/// Configuration for the `fetch` command.
#[derive(Parser, Debug, Clone)]
pub struct FetchConfig {
    /// Title of the slide; names both the source (`<title>.svs`) and every
    /// generated artifact.
    pub title: String,

    /// Base URL of the WebScope tile server.
    pub url: String,

    /// Width of the selected region in source pixels.
    #[arg(short = 'W', long, default_value_t = DEFAULT_REGION_SIZE)]
    pub width: u32,

    /// Height of the selected region in source pixels.
    #[arg(short = 'H', long, default_value_t = DEFAULT_REGION_SIZE)]
    pub height: u32,

    /// Horizontal offset of the region in source pixels.
    #[arg(short, long, default_value_t = 0)]
    pub x_offset: u32,

    /// Vertical offset of the region in source pixels.
    #[arg(short, long, default_value_t = 0)]
    pub y_offset: u32,

    /// Magnification between 0.2 and 40. Lower values save bandwidth.
    /// Out-of-range values fall back to 1x with a warning.
    #[arg(short, long, default_value_t = BASE_MAGNIFICATION)]
    pub magnification: f64,

    /// JPEG quality requested from the tile source (1-100).
    #[arg(short, long, default_value_t = DEFAULT_QUALITY)]
    pub quality: u8,

    /// Format of the final stitched image.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Jpg)]
    pub format: OutputFormat,

    /// Keep the individual fetched tile files, not just the raster.
    #[arg(long, default_value_t = false)]
    pub keep: bool,

    /// Reuse tiles already present in a previous run's raster instead of
    /// re-fetching them.
    #[arg(long, default_value_t = false)]
    pub recycle: bool,

    /// Tile edge length in pixels. Changing this between recycled runs
    /// invalidates the previous raster.
    #[arg(long, default_value_t = DEFAULT_TILE_SIDE, env = "WSIM_TILE_SIDE")]
    pub tile_side: u32,

    /// Directory for the raster and the encoded mosaic.
    #[arg(long, default_value = ".", env = "WSIM_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Directory for kept tile files.
    #[arg(long, default_value = DEFAULT_TILES_DIR, env = "WSIM_TILES_DIR")]
    pub tiles_dir: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl FetchConfig {
    /// Validate the configuration and return an error message if invalid.
    ///
    /// Geometry errors are rejected here, before any I/O begins.
    /// Magnification is deliberately NOT validated here: out-of-range values
    /// are recovered by clamping with a warning in the geometry layer.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.is_empty() {
            return Err("title must not be empty".to_string());
        }

        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "width and height must be greater than 0 (got {}x{})",
                self.width, self.height
            ));
        }

        if self.quality == 0 || self.quality > 100 {
            return Err("quality must be between 1 and 100".to_string());
        }

        if self.tile_side == 0 {
            return Err("tile-side must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Path of the persisted raster for this title.
    pub fn raster_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.title, RASTER_EXTENSION))
    }

    /// Path of the final encoded mosaic for this title.
    pub fn mosaic_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.title, self.format.extension()))
    }
}

/// Configuration for the `clean` command.
#[derive(Parser, Debug, Clone)]
pub struct CleanConfig {
    /// Directory holding rasters and encoded mosaics.
    #[arg(long, default_value = ".", env = "WSIM_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Directory holding kept tile files.
    #[arg(long, default_value = DEFAULT_TILES_DIR, env = "WSIM_TILES_DIR")]
    pub tiles_dir: PathBuf,
}

// =============================================================================
// Tests
// =============================================================================
