//! Persisted raster store.
//!
//! The mosaic being assembled is a large 3-channel byte array that usually
//! does not fit comfortably in memory. It lives in a disk file that is
//! memory-mapped for the duration of one run, so individual tile writes touch
//! only the pages they cover and a crashed or interrupted run leaves every
//! finished tile on disk.
//!
//! File format:
//! - Header (16 bytes): magic `WSIM`, then height, width and tile side as
//!   little-endian u32
//! - Data: `height * width * 3` RGB bytes in row-major order
//!
//! Resizing between runs is a two-phase commit: the new raster is built at a
//! temporary path, the overlap region is copied from the old file, and only
//! then is the temporary file renamed over the original. The old raster is
//! never modified in place, so an interruption mid-resize loses nothing.

mod raster;

pub use raster::{RasterShape, RasterStore, RASTER_HEADER_LEN, RASTER_MAGIC};
