use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while turning a region request into a tile grid.
///
/// Geometry is resolved before any I/O begins, so these never leave a
/// partial raster behind.
#[derive(Debug, Clone, Error)]
pub enum GeometryError {
    /// Requested region has a zero or otherwise unusable dimension
    #[error("Invalid region geometry: width={width}, height={height} (both must be > 0)")]
    InvalidGeometry { width: u32, height: u32 },
}

/// Errors from the tile fetch collaborator.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Server answered with a non-success status code
    #[error("Server returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// The endpoint base URL could not be parsed
    #[error("Invalid endpoint URL '{url}': {message}")]
    InvalidEndpoint { url: String, message: String },

    /// Failed to read the response body
    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// Errors from the persisted raster store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error while creating, mapping or renaming the raster file
    #[error("Raster I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Existing raster file cannot be parsed as a raster of the expected
    /// layout. Recovery requires `clean` and a fresh run.
    #[error("Corrupt raster file {path}: {reason} (run `clean` and retry)")]
    Corrupt { path: PathBuf, reason: String },

    /// Existing raster has a valid header but a different shape than requested
    #[error(
        "Raster shape mismatch at {path}: file is {found_height}x{found_width}, \
         expected {expected_height}x{expected_width}"
    )]
    ShapeMismatch {
        path: PathBuf,
        found_height: u32,
        found_width: u32,
        expected_height: u32,
        expected_width: u32,
    },
}

/// Errors raised by the stitch loop.
///
/// Per-tile failures identify the grid coordinate that failed; the partial
/// raster written up to that point stays on disk so a `--recycle` re-run can
/// resume from it.
#[derive(Debug, Error)]
pub enum StitchError {
    /// The fetch collaborator failed for one tile
    #[error("Failed to fetch tile ({x}, {y}): {source}")]
    Fetch {
        x: u32,
        y: u32,
        #[source]
        source: FetchError,
    },

    /// The fetched bytes could not be decoded as an image
    #[error("Failed to decode tile ({x}, {y}): {message}")]
    Decode { x: u32, y: u32, message: String },

    /// A decoded tile has the wrong pixel dimensions. Fatal: mosaic
    /// integrity cannot be guaranteed with misaligned tiles.
    #[error(
        "Tile shape mismatch at ({x}, {y}): got {width}x{height}, expected {expected}x{expected}"
    )]
    TileShapeMismatch {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        expected: u32,
    },

    /// Failed to write a kept tile file to the tiles directory
    #[error("Failed to keep tile ({x}, {y}) at {path}: {source}")]
    Keep {
        x: u32,
        y: u32,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create the tiles directory for kept tiles
    #[error("Failed to create tiles directory {path}: {source}")]
    KeepDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Raster store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from encoding the finished mosaic to its display format.
#[derive(Debug, Error)]
pub enum FinalizeError {
    /// The image encoder rejected the raster
    #[error("Failed to encode mosaic to {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// Raster store failure while flushing or closing
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Top-level error for a whole fetch run.
#[derive(Debug, Error)]
pub enum MosaicError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Stitch(#[from] StitchError),

    #[error(transparent)]
    Finalize(#[from] FinalizeError),
}
