//! Region geometry: magnification clamping, zoom factors and the tile grid.
//!
//! This module turns a requested pixel region into the grid of fixed-size
//! tiles that covers it, and maps grid coordinates back to absolute
//! source-space offsets for the fetch collaborator.
//!
//! # Magnification policy
//!
//! The tile source supports a continuous magnification range of
//! [0.2, 40]. Values outside this range are replaced by the documented
//! fallback of 1x with a warning; they are never a hard error. The zoom
//! factor is the integer downsampling relative to the native 40x scan:
//! `zoom = floor(40 / magnification)`, at least 1.

use tracing::{info, warn};

use crate::config::{BASE_MAGNIFICATION, FALLBACK_MAGNIFICATION, MIN_MAGNIFICATION};
use crate::error::GeometryError;

// =============================================================================
// Magnification and zoom
// =============================================================================

/// Clamp a requested magnification to the supported range.
///
/// Out-of-range values are replaced by [`FALLBACK_MAGNIFICATION`] with a
/// warning, matching the tile source's own behavior.
pub fn effective_magnification(magnification: f64) -> f64 {
    if !magnification.is_finite()
        || magnification < MIN_MAGNIFICATION
        || magnification > BASE_MAGNIFICATION
    {
        warn!(
            "Magnification {} is outside [{}, {}], falling back to {}x",
            magnification, MIN_MAGNIFICATION, BASE_MAGNIFICATION, FALLBACK_MAGNIFICATION
        );
        FALLBACK_MAGNIFICATION
    } else {
        info!("Magnification: {}x", magnification);
        magnification
    }
}

/// Derive the integer zoom factor for a magnification.
///
/// The source serves pixels downsampled by this factor relative to its
/// native 40x scan. Always >= 1.
pub fn zoom_factor(magnification: f64) -> u32 {
    let mag = effective_magnification(magnification);
    ((BASE_MAGNIFICATION / mag).floor() as u32).max(1)
}

// =============================================================================
// Tile grid
// =============================================================================

/// The grid of fixed-size tiles covering a requested region at a given zoom.
///
/// `x_tiles * tile_side` is the smallest multiple of `tile_side` that covers
/// `width / zoom` target pixels (likewise for y), so the raster never
/// under-covers the requested region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    /// Tile edge length in pixels
    pub tile_side: u32,

    /// Number of tile columns
    pub x_tiles: u32,

    /// Number of tile rows
    pub y_tiles: u32,

    /// Integer downsampling factor relative to the native scan
    pub zoom: u32,
}

impl TileGrid {
    /// Compute the covering grid for a region of `width` x `height` source
    /// pixels at the given zoom.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidGeometry`] if either dimension is 0.
    pub fn compute(
        width: u32,
        height: u32,
        zoom: u32,
        tile_side: u32,
    ) -> Result<Self, GeometryError> {
        if width == 0 || height == 0 {
            return Err(GeometryError::InvalidGeometry { width, height });
        }

        let x_tiles = (width / zoom).div_ceil(tile_side).max(1);
        let y_tiles = (height / zoom).div_ceil(tile_side).max(1);

        Ok(Self {
            tile_side,
            x_tiles,
            y_tiles,
            zoom,
        })
    }

    /// Total number of tiles in the grid.
    pub fn total_tiles(&self) -> u32 {
        self.x_tiles * self.y_tiles
    }

    /// Width of the assembled raster in pixels.
    pub fn raster_width(&self) -> u32 {
        self.x_tiles * self.tile_side
    }

    /// Height of the assembled raster in pixels.
    pub fn raster_height(&self) -> u32 {
        self.y_tiles * self.tile_side
    }
}

// =============================================================================
// Tile request builder
// =============================================================================

/// A fully-qualified request for one tile, ready for the fetch collaborator.
///
/// The five numeric fields plus the title identify the tile uniquely and
/// deterministically on the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    /// Slide identifier on the source
    pub title: String,

    /// Absolute horizontal offset in source space (already zoom-divided)
    pub src_xoff: u32,

    /// Absolute vertical offset in source space (already zoom-divided)
    pub src_yoff: u32,

    /// Requested tile edge length in pixels
    pub tile_side: u32,

    /// Integer downsampling factor
    pub zoom: u32,

    /// JPEG quality (1-100)
    pub quality: u8,
}

/// Builds [`TileRequest`]s for grid coordinates.
///
/// Pure: grid coordinates map bijectively to source-space offsets via
/// `src_xoff = x_offset / zoom + x * tile_side` (likewise for y). Malformed
/// inputs are caught upstream by [`TileGrid::compute`].
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    title: String,
    x_offset: u32,
    y_offset: u32,
    tile_side: u32,
    zoom: u32,
    quality: u8,
}

impl RequestTemplate {
    /// Create a template for a region anchored at `(x_offset, y_offset)`.
    pub fn new(
        title: impl Into<String>,
        x_offset: u32,
        y_offset: u32,
        grid: &TileGrid,
        quality: u8,
    ) -> Self {
        Self {
            title: title.into(),
            x_offset,
            y_offset,
            tile_side: grid.tile_side,
            zoom: grid.zoom,
            quality,
        }
    }

    /// The slide title this template requests tiles for.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The request descriptor for the tile at grid coordinate `(x, y)`.
    pub fn tile_request(&self, x: u32, y: u32) -> TileRequest {
        TileRequest {
            title: self.title.clone(),
            src_xoff: self.x_offset / self.zoom + x * self.tile_side,
            src_yoff: self.y_offset / self.zoom + y * self.tile_side,
            tile_side: self.tile_side,
            zoom: self.zoom,
            quality: self.quality,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
