//! End-to-end stitch scenarios against mock tile sources.

use tempfile::TempDir;

use wsi_mosaic::error::StitchError;
use wsi_mosaic::geometry::{RequestTemplate, TileGrid};
use wsi_mosaic::stitch::Stitcher;
use wsi_mosaic::store::{RasterShape, RasterStore};

use super::test_utils::{DeterministicFetcher, FlakyFetcher, MisshapenFetcher};

const SIDE: u32 = 10;

fn grid_for(tiles: u32) -> TileGrid {
    TileGrid::compute(tiles * SIDE, tiles * SIDE, 1, SIDE).unwrap()
}

fn template_for(grid: &TileGrid) -> RequestTemplate {
    RequestTemplate::new("sample", 0, 0, grid, 80)
}

/// Run a complete fresh stitch of `tiles` x `tiles` and return the raster
/// pixels.
fn cold_run(dir: &TempDir, name: &str, tiles: u32) -> Vec<u8> {
    let grid = grid_for(tiles);
    let template = template_for(&grid);
    let fetcher = DeterministicFetcher::new(SIDE);

    let path = dir.path().join(format!("{name}.raster"));
    let (mut store, overlap) =
        RasterStore::recycle_or_create(&path, RasterShape::from_grid(&grid), SIDE, false).unwrap();
    let (xskip, yskip) = store.skip_thresholds(overlap);

    Stitcher::new(&fetcher)
        .stitch(&grid, &template, &mut store, xskip, yskip)
        .unwrap();

    let pixels = store.pixels().to_vec();
    store.close().unwrap();
    pixels
}

// =============================================================================
// Fresh Runs
// =============================================================================

#[test]
fn test_full_run_fetches_whole_grid() {
    let dir = TempDir::new().unwrap();
    let grid = grid_for(4);
    let template = template_for(&grid);
    let fetcher = DeterministicFetcher::new(SIDE);

    let path = dir.path().join("sample.raster");
    let (mut store, _) =
        RasterStore::recycle_or_create(&path, RasterShape::from_grid(&grid), SIDE, false).unwrap();

    let report = Stitcher::new(&fetcher)
        .stitch(&grid, &template, &mut store, 0, 0)
        .unwrap();

    assert_eq!(report.total, 16);
    assert_eq!(report.fetched, 16);
    assert_eq!(report.reused, 0);
    assert_eq!(fetcher.request_count(), 16);

    let shape = store.shape();
    assert_eq!((shape.height, shape.width), (40, 40));
    assert_eq!(store.pixels().len(), 40 * 40 * 3);
}

// =============================================================================
// Recycled Runs
// =============================================================================

/// Scenario: 4x4 raster resized to 6x6 with recycle. The old 4x4 block is
/// skipped, the remaining 20 tiles are fetched, and the top-left block is
/// preserved unchanged.
#[test]
fn test_recycle_after_growth_skips_old_block() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sample.raster");

    // First run: 4x4.
    let first_pixels = {
        let grid = grid_for(4);
        let template = template_for(&grid);
        let fetcher = DeterministicFetcher::new(SIDE);
        let (mut store, _) =
            RasterStore::recycle_or_create(&path, RasterShape::from_grid(&grid), SIDE, false)
                .unwrap();
        Stitcher::new(&fetcher)
            .stitch(&grid, &template, &mut store, 0, 0)
            .unwrap();
        let pixels = store.pixels().to_vec();
        store.close().unwrap();
        pixels
    };

    // Second run: 6x6 with recycle.
    let grid = grid_for(6);
    let template = template_for(&grid);
    let fetcher = DeterministicFetcher::new(SIDE);
    let (mut store, overlap) =
        RasterStore::recycle_or_create(&path, RasterShape::from_grid(&grid), SIDE, true).unwrap();
    let (xskip, yskip) = store.skip_thresholds(overlap);
    assert_eq!((xskip, yskip), (4, 4));

    let report = Stitcher::new(&fetcher)
        .stitch(&grid, &template, &mut store, xskip, yskip)
        .unwrap();

    assert_eq!(report.total, 36);
    assert_eq!(report.reused, 16);
    assert_eq!(report.fetched, 20);
    assert_eq!(fetcher.request_count(), 20);

    // Final raster shape is (60, 60, 3).
    assert_eq!(store.pixels().len(), 60 * 60 * 3);

    // Top-left 40x40 block is byte-identical to the first run.
    let old_row = 40 * 3;
    let new_row = 60 * 3;
    for row in 0..40 {
        assert_eq!(
            &store.pixels()[row * new_row..row * new_row + old_row],
            &first_pixels[row * old_row..(row + 1) * old_row],
            "row {row}"
        );
    }

    // And the recycled result matches a cold 6x6 run byte for byte.
    let pixels = store.pixels().to_vec();
    store.close().unwrap();
    let cold = cold_run(&dir, "cold6", 6);
    assert_eq!(pixels, cold);
}

/// Reuse correctness: recycling an unchanged, completed region fetches
/// nothing and yields a raster byte-identical to a full re-run.
#[test]
fn test_recycle_unchanged_region_is_byte_identical_and_free() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sample.raster");

    let grid = grid_for(4);
    let template = template_for(&grid);

    let first = {
        let fetcher = DeterministicFetcher::new(SIDE);
        let (mut store, _) =
            RasterStore::recycle_or_create(&path, RasterShape::from_grid(&grid), SIDE, false)
                .unwrap();
        Stitcher::new(&fetcher)
            .stitch(&grid, &template, &mut store, 0, 0)
            .unwrap();
        let pixels = store.pixels().to_vec();
        store.close().unwrap();
        pixels
    };

    let fetcher = DeterministicFetcher::new(SIDE);
    let (mut store, overlap) =
        RasterStore::recycle_or_create(&path, RasterShape::from_grid(&grid), SIDE, true).unwrap();
    let (xskip, yskip) = store.skip_thresholds(overlap);

    let report = Stitcher::new(&fetcher)
        .stitch(&grid, &template, &mut store, xskip, yskip)
        .unwrap();

    assert_eq!(report.fetched, 0);
    assert_eq!(report.reused, 16);
    assert_eq!(fetcher.request_count(), 0);
    assert_eq!(store.pixels(), &first[..]);
}

// =============================================================================
// Failure Scenarios
// =============================================================================

/// A per-tile fetch failure aborts the run naming the coordinate, and the
/// tiles written before the failure stay on disk.
#[test]
fn test_fetch_failure_aborts_and_leaves_partial_raster() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sample.raster");

    let grid = grid_for(4);
    let template = template_for(&grid);
    // First 5 tiles succeed: column x=0 (4 tiles) and (1, 0).
    let fetcher = FlakyFetcher::new(SIDE, 5);

    let (mut store, _) =
        RasterStore::recycle_or_create(&path, RasterShape::from_grid(&grid), SIDE, false).unwrap();

    let err = Stitcher::new(&fetcher)
        .stitch(&grid, &template, &mut store, 0, 0)
        .unwrap_err();

    match err {
        StitchError::Fetch { x, y, .. } => assert_eq!((x, y), (1, 1)),
        other => panic!("unexpected error: {other}"),
    }

    // 5 successful requests plus the failing one.
    assert_eq!(fetcher.request_count(), 6);

    // Tiles fetched before the failure are on disk and non-zero.
    for (x, y) in [(0, 0), (0, 1), (0, 2), (0, 3), (1, 0)] {
        assert!(
            store.read_tile(x, y).iter().all(|&b| b != 0),
            "tile ({x}, {y}) should have been written"
        );
    }
    // The failed tile and everything after it are untouched.
    assert!(store.read_tile(1, 1).iter().all(|&b| b == 0));
    assert!(store.read_tile(3, 3).iter().all(|&b| b == 0));

    // Aborting does not delete the raster file.
    drop(store);
    assert!(path.exists());
}

/// Scenario: the source serves a tile decoding to the wrong dimensions. The
/// run aborts with the coordinate identified and prior tiles intact.
#[test]
fn test_shape_mismatch_aborts_with_coordinate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sample.raster");

    let grid = grid_for(4);
    let template = template_for(&grid);
    // Tile (2, 1) decodes to 8x10 instead of 10x10.
    let fetcher = MisshapenFetcher::new(SIDE, (2 * SIDE, SIDE), (8, 10));

    let (mut store, _) =
        RasterStore::recycle_or_create(&path, RasterShape::from_grid(&grid), SIDE, false).unwrap();

    let err = Stitcher::new(&fetcher)
        .stitch(&grid, &template, &mut store, 0, 0)
        .unwrap_err();

    match err {
        StitchError::TileShapeMismatch {
            x,
            y,
            width,
            height,
            expected,
        } => {
            assert_eq!((x, y), (2, 1));
            assert_eq!((width, height), (8, 10));
            assert_eq!(expected, SIDE);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Everything stitched before (2, 1) is still there.
    for (x, y) in [(0, 0), (1, 3), (2, 0)] {
        assert!(store.read_tile(x, y).iter().all(|&b| b != 0));
    }
}
