//! # WSI Mosaic
//!
//! Downloads a rectangular region of a Whole Slide Image (WSI) from a
//! WebScope tile server and stitches it into a single large raster on local
//! disk, then encodes it as an ordinary image file.
//!
//! Whole slide scans are far too large to download in one request, so the
//! region is fetched as a grid of fixed-size tiles. The mosaic being
//! assembled lives in a memory-mapped disk file, which keeps memory use flat
//! and makes interrupted runs resumable: a `--recycle` re-run reuses every
//! tile the previous run already wrote, resizing the persisted raster while
//! preserving the overlap when the requested region grew or shrank.
//!
//! ## Architecture
//!
//! The run is a straight pipeline, fully sequential by design:
//!
//! - [`geometry`] - tile grid arithmetic and per-tile request descriptors
//! - [`fetch`] - the tile retrieval collaborator (blocking HTTP) and decoding
//! - [`store`] - the memory-mapped persisted raster, with
//!   resize-with-overlap-preservation between runs
//! - [`stitch`] - the fetch-or-reuse loop writing tiles into the raster
//! - [`finalize`] - final single-image encoding and store release
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use wsi_mosaic::fetch::HttpTileFetcher;
//! use wsi_mosaic::geometry::{zoom_factor, RequestTemplate, TileGrid};
//! use wsi_mosaic::stitch::Stitcher;
//! use wsi_mosaic::store::{RasterShape, RasterStore};
//!
//! # fn main() -> Result<(), wsi_mosaic::MosaicError> {
//! let zoom = zoom_factor(40.0);
//! let grid = TileGrid::compute(1000, 1000, zoom, 250)?;
//! let template = RequestTemplate::new("CMU-1", 0, 0, &grid, 80);
//!
//! let fetcher = HttpTileFetcher::new("http://webscope.example.org/")
//!     .map_err(|e| wsi_mosaic::StitchError::Fetch { x: 0, y: 0, source: e })?;
//!
//! let (mut store, overlap) =
//!     RasterStore::recycle_or_create("CMU-1.raster", RasterShape::from_grid(&grid), 250, true)?;
//! let (xskip, yskip) = store.skip_thresholds(overlap);
//!
//! let report = Stitcher::new(&fetcher).stitch(&grid, &template, &mut store, xskip, yskip)?;
//! println!("fetched {} of {} tiles", report.fetched, report.total);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod finalize;
pub mod geometry;
pub mod stitch;
pub mod store;

// Re-export commonly used types
pub use config::{CleanConfig, Cli, Command, FetchConfig, OutputFormat};
pub use error::{FetchError, FinalizeError, GeometryError, MosaicError, StitchError, StoreError};
pub use fetch::{decode_tile, DecodedTile, HttpTileFetcher, TileFetcher};
pub use finalize::write_mosaic;
pub use geometry::{
    effective_magnification, zoom_factor, RequestTemplate, TileGrid, TileRequest,
};
pub use stitch::{StitchReport, Stitcher};
pub use store::{RasterShape, RasterStore};
