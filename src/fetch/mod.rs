//! Tile retrieval and decoding.
//!
//! The stitch loop talks to the tile source through the [`TileFetcher`]
//! trait: it hands over a fully-formed [`TileRequest`](crate::geometry::TileRequest)
//! and gets back the raw encoded bytes of one tile, or an error. The HTTP
//! implementation for WebScope servers lives in [`http`]; tests substitute
//! their own fetchers.
//!
//! Decoding the raw bytes into an RGB pixel buffer is a separate step
//! ([`decode_tile`]) so that the stitcher can validate the decoded shape
//! before anything touches the raster.

mod http;

pub use http::HttpTileFetcher;

use std::io::Cursor;

use bytes::Bytes;
use image::ImageReader;

use crate::error::FetchError;
use crate::geometry::TileRequest;

/// External collaborator that retrieves one encoded tile.
///
/// Implementations are free to define their own transport and timeout
/// policy; the stitch loop blocks on each call and does not retry. Repeating
/// a request must be deterministic: the same request always identifies the
/// same tile.
pub trait TileFetcher {
    fn fetch(&self, request: &TileRequest) -> Result<Bytes, FetchError>;
}

/// A decoded tile: RGB pixels plus the dimensions they were decoded at.
///
/// Transient: the stitcher drops this as soon as the pixels are written into
/// the raster.
#[derive(Debug)]
pub struct DecodedTile {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode raw JPEG tile bytes into an RGB buffer.
///
/// The caller is responsible for checking the decoded dimensions against the
/// expected tile side; this function only reports what it decoded.
pub fn decode_tile(raw: &[u8]) -> Result<DecodedTile, String> {
    let reader = ImageReader::with_format(Cursor::new(raw), image::ImageFormat::Jpeg);
    let img = reader.decode().map_err(|e| e.to_string())?;

    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    Ok(DecodedTile {
        pixels: rgb.into_raw(),
        width,
        height,
    })
}

// =============================================================================
// Tests
// =============================================================================
