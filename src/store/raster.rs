//! Memory-mapped raster file with create / open / resize / close lifecycle.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapMut};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::geometry::TileGrid;

/// Magic bytes at the start of every raster file.
pub const RASTER_MAGIC: [u8; 4] = *b"WSIM";

/// Header length in bytes: magic + height + width + tile side.
pub const RASTER_HEADER_LEN: usize = 16;

/// Number of channels per pixel. The mosaic is always RGB.
const CHANNELS: usize = 3;

// =============================================================================
// Shape
// =============================================================================

/// Pixel dimensions of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterShape {
    pub height: u32,
    pub width: u32,
}

impl RasterShape {
    /// Shape of the raster covering a tile grid.
    pub fn from_grid(grid: &TileGrid) -> Self {
        Self {
            height: grid.raster_height(),
            width: grid.raster_width(),
        }
    }

    /// The overlap rectangle shared with another shape, anchored at (0, 0).
    pub fn overlap(&self, other: &RasterShape) -> RasterShape {
        RasterShape {
            height: self.height.min(other.height),
            width: self.width.min(other.width),
        }
    }

    /// Total pixel data length in bytes.
    fn byte_len(&self) -> usize {
        self.height as usize * self.width as usize * CHANNELS
    }

    /// Length of one pixel row in bytes.
    fn row_len(&self) -> usize {
        self.width as usize * CHANNELS
    }
}

// =============================================================================
// Header
// =============================================================================

fn encode_header(shape: RasterShape, tile_side: u32) -> [u8; RASTER_HEADER_LEN] {
    let mut header = [0u8; RASTER_HEADER_LEN];
    header[0..4].copy_from_slice(&RASTER_MAGIC);
    header[4..8].copy_from_slice(&shape.height.to_le_bytes());
    header[8..12].copy_from_slice(&shape.width.to_le_bytes());
    header[12..16].copy_from_slice(&tile_side.to_le_bytes());
    header
}

fn decode_header(path: &Path, bytes: &[u8]) -> Result<(RasterShape, u32), StoreError> {
    if bytes.len() < RASTER_HEADER_LEN {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: format!(
                "file is {} bytes, smaller than the {}-byte header",
                bytes.len(),
                RASTER_HEADER_LEN
            ),
        });
    }

    if bytes[0..4] != RASTER_MAGIC {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: "bad magic bytes, not a raster file".to_string(),
        });
    }

    let height = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let width = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let tile_side = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let shape = RasterShape { height, width };
    let expected_len = RASTER_HEADER_LEN + shape.byte_len();
    if bytes.len() != expected_len {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: format!(
                "file is {} bytes, header promises {}",
                bytes.len(),
                expected_len
            ),
        });
    }

    Ok((shape, tile_side))
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// =============================================================================
// Raster store
// =============================================================================

/// Exclusive owner of the on-disk raster for the duration of one run.
///
/// The store is opened (fresh, matching, or resized from a previous run),
/// written by the single stitch loop, and consumed by [`RasterStore::close`]
/// at normal completion. Tile writes target disjoint byte rectangles and are
/// pure overwrites, so a repeated write is idempotent.
#[derive(Debug)]
pub struct RasterStore {
    path: PathBuf,
    map: MmapMut,
    shape: RasterShape,
    tile_side: u32,
}

impl RasterStore {
    /// Create a fresh zero-initialized raster, replacing any existing file.
    pub fn create(
        path: impl Into<PathBuf>,
        shape: RasterShape,
        tile_side: u32,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;

        let len = (RASTER_HEADER_LEN + shape.byte_len()) as u64;
        file.set_len(len).map_err(|e| io_err(&path, e))?;

        let mut map = unsafe { MmapMut::map_mut(&file) }.map_err(|e| io_err(&path, e))?;
        map[..RASTER_HEADER_LEN].copy_from_slice(&encode_header(shape, tile_side));

        debug!(
            "Created raster {} ({}x{}, {} bytes)",
            path.display(),
            shape.height,
            shape.width,
            len
        );

        Ok(Self {
            path,
            map,
            shape,
            tile_side,
        })
    }

    /// Open an existing raster read-write. The file must match `shape` and
    /// `tile_side` exactly.
    ///
    /// # Errors
    ///
    /// [`StoreError::Corrupt`] if the file cannot be parsed as a raster, and
    /// [`StoreError::ShapeMismatch`] if it parses but has different
    /// dimensions.
    pub fn open(
        path: impl Into<PathBuf>,
        shape: RasterShape,
        tile_side: u32,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;

        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|e| io_err(&path, e))?;
        let (found_shape, found_tile_side) = decode_header(&path, &map)?;

        if found_tile_side != tile_side {
            return Err(StoreError::Corrupt {
                path,
                reason: format!(
                    "raster was written with tile side {}, this run uses {}",
                    found_tile_side, tile_side
                ),
            });
        }

        if found_shape != shape {
            return Err(StoreError::ShapeMismatch {
                path,
                found_height: found_shape.height,
                found_width: found_shape.width,
                expected_height: shape.height,
                expected_width: shape.width,
            });
        }

        Ok(Self {
            path,
            map,
            shape,
            tile_side,
        })
    }

    /// Resize a previous run's raster to `new_shape`, preserving the overlap
    /// region. Returns the store plus the overlap shape in pixels.
    ///
    /// Two-phase commit: the new raster is assembled at `<path>.tmp` while
    /// the old file stays untouched, then renamed over it. An interruption
    /// before the rename leaves the old raster fully intact.
    ///
    /// # Errors
    ///
    /// [`StoreError::Corrupt`] if the old file cannot be parsed or was
    /// written with a different tile side (recycling across tile sizes is
    /// not possible).
    pub fn resize(
        path: impl Into<PathBuf>,
        new_shape: RasterShape,
        tile_side: u32,
    ) -> Result<(Self, RasterShape), StoreError> {
        let path = path.into();

        // Old raster, read-only, kept alive until the copy completes.
        let old_file = File::open(&path).map_err(|e| io_err(&path, e))?;
        let old_map = unsafe { Mmap::map(&old_file) }.map_err(|e| io_err(&path, e))?;
        let (old_shape, old_tile_side) = decode_header(&path, &old_map)?;

        if old_tile_side != tile_side {
            return Err(StoreError::Corrupt {
                path,
                reason: format!(
                    "raster was written with tile side {}, this run uses {}; \
                     recycling is not possible",
                    old_tile_side, tile_side
                ),
            });
        }

        let overlap = old_shape.overlap(&new_shape);
        info!(
            "Resizing raster {} from {}x{} to {}x{} (preserving {}x{})",
            path.display(),
            old_shape.height,
            old_shape.width,
            new_shape.height,
            new_shape.width,
            overlap.height,
            overlap.width
        );

        let tmp_path = tmp_sibling(&path);
        let mut new_store = Self::create(&tmp_path, new_shape, tile_side)?;

        // Copy the overlap rectangle row by row; everything else stays zero.
        let copy_len = overlap.row_len();
        for row in 0..overlap.height as usize {
            let src = RASTER_HEADER_LEN + row * old_shape.row_len();
            let dst = RASTER_HEADER_LEN + row * new_shape.row_len();
            new_store.map[dst..dst + copy_len].copy_from_slice(&old_map[src..src + copy_len]);
        }

        // Commit: flush the copy, then atomically replace the old file.
        new_store.map.flush().map_err(|e| io_err(&tmp_path, e))?;
        drop(old_map);
        std::fs::rename(&tmp_path, &path).map_err(|e| io_err(&path, e))?;
        new_store.path = path;

        Ok((new_store, overlap))
    }

    /// Open the raster for a run, honoring the recycle flag.
    ///
    /// - Fresh run, or nothing on disk: a new zeroed raster, empty overlap.
    /// - Recycling with a matching raster: opened in place, full overlap.
    /// - Recycling with a different shape: resized via [`RasterStore::resize`].
    ///
    /// A corrupt file on disk is fatal either way.
    pub fn recycle_or_create(
        path: impl Into<PathBuf>,
        shape: RasterShape,
        tile_side: u32,
        recycle: bool,
    ) -> Result<(Self, RasterShape), StoreError> {
        let path = path.into();

        if !recycle || !path.exists() {
            let store = Self::create(path, shape, tile_side)?;
            return Ok((
                store,
                RasterShape {
                    height: 0,
                    width: 0,
                },
            ));
        }

        match Self::open(&path, shape, tile_side) {
            Ok(store) => Ok((store, shape)),
            Err(StoreError::ShapeMismatch { .. }) => Self::resize(path, shape, tile_side),
            Err(e) => Err(e),
        }
    }

    /// Tile skip thresholds after a resize: a tile at `(x, y)` from the
    /// previous run is still fully valid only if `x < xskip && y < yskip`,
    /// i.e. its whole footprint lies inside the overlap. Partially covered
    /// tiles are not counted and will be re-fetched.
    pub fn skip_thresholds(&self, overlap: RasterShape) -> (u32, u32) {
        (
            overlap.width / self.tile_side,
            overlap.height / self.tile_side,
        )
    }

    /// Write one decoded tile at grid coordinate `(x, y)`.
    ///
    /// `pixels` must be exactly `tile_side * tile_side * 3` bytes; the
    /// stitch loop validates decoded tile shapes before calling this.
    pub fn write_tile(&mut self, x: u32, y: u32, pixels: &[u8]) {
        let side = self.tile_side as usize;
        debug_assert_eq!(pixels.len(), side * side * CHANNELS);

        let row_len = self.shape.row_len();
        let tile_row_len = side * CHANNELS;
        let x_byte = x as usize * tile_row_len;

        for row in 0..side {
            let dst = RASTER_HEADER_LEN + (y as usize * side + row) * row_len + x_byte;
            let src = row * tile_row_len;
            self.map[dst..dst + tile_row_len].copy_from_slice(&pixels[src..src + tile_row_len]);
        }
    }

    /// Read back one tile's pixels. Used by tests and by consumers that want
    /// to verify reuse.
    pub fn read_tile(&self, x: u32, y: u32) -> Vec<u8> {
        let side = self.tile_side as usize;
        let row_len = self.shape.row_len();
        let tile_row_len = side * CHANNELS;
        let x_byte = x as usize * tile_row_len;

        let mut out = Vec::with_capacity(side * tile_row_len);
        for row in 0..side {
            let src = RASTER_HEADER_LEN + (y as usize * side + row) * row_len + x_byte;
            out.extend_from_slice(&self.map[src..src + tile_row_len]);
        }
        out
    }

    /// The raw RGB pixel data, without the header.
    pub fn pixels(&self) -> &[u8] {
        &self.map[RASTER_HEADER_LEN..]
    }

    /// Pixel dimensions of this raster.
    pub fn shape(&self) -> RasterShape {
        self.shape
    }

    /// Tile edge length this raster was written with.
    pub fn tile_side(&self) -> u32 {
        self.tile_side
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the backing file in bytes.
    pub fn file_len(&self) -> u64 {
        self.map.len() as u64
    }

    /// Flush to durable storage and release the mapping.
    ///
    /// Consumes the store: it is not reused after close.
    pub fn close(self) -> Result<(), StoreError> {
        self.map.flush().map_err(|e| io_err(&self.path, e))?;
        debug!("Closed raster {}", self.path.display());
        Ok(())
    }
}

/// Sibling temp path for the resize commit, e.g. `sample.raster.tmp`.
fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

// =============================================================================
// Tests
// =============================================================================
