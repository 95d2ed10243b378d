//! Grid stitcher: the download-and-assemble loop.
//!
//! Iterates the tile grid in a fixed order (outer loop over columns, inner
//! loop over rows), decides per tile whether to reuse the previous run's
//! pixels or fetch fresh ones, and writes each decoded tile into its
//! disjoint rectangle of the raster. Tiles are independent, so the order
//! only affects progress reporting.
//!
//! A tile is reused only when recycling was requested for this run and the
//! tile's full footprint lies inside the overlap preserved by the store's
//! resize. Everything else is fetched through the
//! [`TileFetcher`](crate::fetch::TileFetcher) collaborator.
//!
//! Any per-tile failure aborts the run identifying the failing coordinate.
//! The partial raster is left on disk in whatever state it reached: that is
//! the recovery artifact a later `--recycle` run resumes from, not garbage.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::StitchError;
use crate::fetch::{decode_tile, TileFetcher};
use crate::geometry::{RequestTemplate, TileGrid};
use crate::store::RasterStore;

// =============================================================================
// Report
// =============================================================================

/// Tile counts emitted at the end of a stitch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StitchReport {
    /// Total number of tiles in the grid
    pub total: u32,

    /// Tiles reused from the previous run's raster
    pub reused: u32,

    /// Tiles fetched from the source
    pub fetched: u32,
}

// =============================================================================
// Stitcher
// =============================================================================

/// Orchestrates one pass over the tile grid.
pub struct Stitcher<'a, F: TileFetcher> {
    fetcher: &'a F,

    /// When set, raw fetched tile bytes are also written to this directory,
    /// one file per grid coordinate.
    keep_dir: Option<PathBuf>,
}

impl<'a, F: TileFetcher> Stitcher<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self {
            fetcher,
            keep_dir: None,
        }
    }

    /// Additionally keep each fetched tile as a file in `dir`.
    pub fn with_keep_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.keep_dir = Some(dir.into());
        self
    }

    /// Run the stitch loop.
    ///
    /// `(xskip, yskip)` are the reuse thresholds from
    /// [`RasterStore::skip_thresholds`]: tiles with `x < xskip && y < yskip`
    /// are already present in the raster and are not fetched again. Pass
    /// `(0, 0)` for a fresh run.
    pub fn stitch(
        &self,
        grid: &TileGrid,
        template: &RequestTemplate,
        store: &mut RasterStore,
        xskip: u32,
        yskip: u32,
    ) -> Result<StitchReport, StitchError> {
        let total = grid.total_tiles();
        info!(
            "Downloading {} grid tiles (skipping {})",
            total,
            xskip.min(grid.x_tiles) * yskip.min(grid.y_tiles)
        );

        if let Some(ref dir) = self.keep_dir {
            ensure_keep_dir(dir)?;
        }

        let mut reused = 0u32;
        let mut fetched = 0u32;

        for x in 0..grid.x_tiles {
            for y in 0..grid.y_tiles {
                let progress = y + grid.y_tiles * x + 1;

                if x < xskip && y < yskip {
                    reused += 1;
                    info!(" - ({}/{}) skipped", progress, total);
                    continue;
                }

                self.fetch_one(grid, template, store, x, y)?;
                fetched += 1;
                info!(" + ({}/{}) complete", progress, total);
            }
        }

        info!(
            "Download complete: {} tiles ({} fetched, {} reused)",
            total, fetched, reused
        );

        Ok(StitchReport {
            total,
            reused,
            fetched,
        })
    }

    /// Fetch, decode, validate and write a single tile.
    fn fetch_one(
        &self,
        grid: &TileGrid,
        template: &RequestTemplate,
        store: &mut RasterStore,
        x: u32,
        y: u32,
    ) -> Result<(), StitchError> {
        let request = template.tile_request(x, y);

        let raw = self
            .fetcher
            .fetch(&request)
            .map_err(|source| StitchError::Fetch { x, y, source })?;

        if let Some(ref dir) = self.keep_dir {
            let path = keep_path(dir, template.title(), x, y);
            std::fs::write(&path, &raw).map_err(|source| StitchError::Keep {
                x,
                y,
                path,
                source,
            })?;
        }

        let decoded =
            decode_tile(&raw).map_err(|message| StitchError::Decode { x, y, message })?;

        if decoded.width != grid.tile_side || decoded.height != grid.tile_side {
            return Err(StitchError::TileShapeMismatch {
                x,
                y,
                width: decoded.width,
                height: decoded.height,
                expected: grid.tile_side,
            });
        }

        // Fully-decoded buffer goes in as one overwrite; the decoded tile is
        // dropped right after.
        store.write_tile(x, y, &decoded.pixels);
        Ok(())
    }
}

/// Deterministic file name for a kept tile.
fn keep_path(dir: &Path, title: &str, x: u32, y: u32) -> PathBuf {
    dir.join(format!("{}_{}_{}.jpg", title, x, y))
}

fn ensure_keep_dir(dir: &Path) -> Result<(), StitchError> {
    std::fs::create_dir_all(dir).map_err(|source| StitchError::KeepDir {
        path: dir.to_path_buf(),
        source,
    })
}

// =============================================================================
// Tests
// =============================================================================
