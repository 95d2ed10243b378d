//! WSI Mosaic - download and stitch a region of a Whole Slide Image.
//!
//! This binary wires the pipeline together: geometry, raster store, stitch
//! loop and final encoding.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_mosaic::{
    config::{CleanConfig, Cli, Command, FetchConfig, RASTER_EXTENSION},
    fetch::HttpTileFetcher,
    finalize::write_mosaic,
    geometry::{zoom_factor, RequestTemplate, TileGrid},
    stitch::Stitcher,
    store::{RasterShape, RasterStore},
    MosaicError,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Fetch(config) => run_fetch(config),
        Command::Clean(config) => run_clean(config),
    }
}

// =============================================================================
// Fetch Command
// =============================================================================

fn run_fetch(config: FetchConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let fetcher = match HttpTileFetcher::new(&config.url) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match fetch_region(&config, &fetcher) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// The whole fetch pipeline: geometry, store, stitch, finalize.
fn fetch_region(config: &FetchConfig, fetcher: &HttpTileFetcher) -> Result<(), MosaicError> {
    // Geometry is resolved before any I/O.
    let zoom = zoom_factor(config.magnification);
    let grid = TileGrid::compute(config.width, config.height, zoom, config.tile_side)?;
    let template = RequestTemplate::new(
        &config.title,
        config.x_offset,
        config.y_offset,
        &grid,
        config.quality,
    );

    info!(
        "Region {}x{} at ({}, {}), zoom {} -> {}x{} tiles of {}px",
        config.width,
        config.height,
        config.x_offset,
        config.y_offset,
        zoom,
        grid.x_tiles,
        grid.y_tiles,
        grid.tile_side
    );
    info!("from: {}{}.svs", config.url, config.title);

    if let Some(parent) = config.raster_path().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| {
                wsi_mosaic::StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                }
            })?;
        }
    }

    // Fresh raster, or the previous run's raster resized around the overlap.
    let (mut store, overlap) = RasterStore::recycle_or_create(
        config.raster_path(),
        RasterShape::from_grid(&grid),
        config.tile_side,
        config.recycle,
    )?;
    let (xskip, yskip) = store.skip_thresholds(overlap);

    let mut stitcher = Stitcher::new(fetcher);
    if config.keep {
        stitcher = stitcher.with_keep_dir(&config.tiles_dir);
    }

    let report = stitcher.stitch(&grid, &template, &mut store, xskip, yskip)?;
    info!(
        "Stitched {} tiles ({} fetched, {} reused)",
        report.total, report.fetched, report.reused
    );

    write_mosaic(store, &config.mosaic_path(), config.format, config.quality)?;
    info!("Done: {}", config.mosaic_path().display());

    Ok(())
}

// =============================================================================
// Clean Command
// =============================================================================

/// Extensions of generated artifacts eligible for cleanup.
const GENERATED_EXTENSIONS: [&str; 4] = [RASTER_EXTENSION, "jpg", "png", "bmp"];

fn run_clean(config: CleanConfig) -> ExitCode {
    init_logging(false);

    if config.tiles_dir.exists() {
        info!("Removing tile image directory {}", config.tiles_dir.display());
        if let Err(e) = std::fs::remove_dir_all(&config.tiles_dir) {
            error!("Failed to remove {}: {}", config.tiles_dir.display(), e);
            return ExitCode::FAILURE;
        }
    }

    match clean_output_dir(&config.output_dir) {
        Ok(removed) => {
            info!("Removed {} file(s)", removed);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to clean {}: {}", config.output_dir.display(), e);
            ExitCode::FAILURE
        }
    }
}

/// Remove every generated artifact (rasters, stray resize temp files and
/// encoded mosaics) in the output directory.
fn clean_output_dir(dir: &Path) -> Result<usize, std::io::Error> {
    let mut removed = 0usize;

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let matches_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| GENERATED_EXTENSIONS.contains(&ext));
        let is_resize_leftover = name.ends_with(&format!(".{}.tmp", RASTER_EXTENSION));

        if matches_ext || is_resize_leftover {
            info!("Removing {}", path.display());
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }

    Ok(removed)
}

// =============================================================================
// Logging
// =============================================================================

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_mosaic=debug"
    } else {
        "wsi_mosaic=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
