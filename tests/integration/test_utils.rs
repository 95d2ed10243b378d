//! Test utilities for integration tests.
//!
//! Provides mock fetch collaborators that serve deterministic synthetic
//! JPEG tiles, with request tracking for verifying reuse behavior.

use std::cell::RefCell;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};

use wsi_mosaic::error::FetchError;
use wsi_mosaic::fetch::TileFetcher;
use wsi_mosaic::geometry::TileRequest;

/// Encode a solid-color JPEG of the given dimensions.
pub fn solid_jpeg_rect(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 100)
        .encode_image(&img)
        .unwrap();
    out
}

/// Encode a solid-color square JPEG of the given side length.
pub fn solid_jpeg(side: u32, color: [u8; 3]) -> Vec<u8> {
    solid_jpeg_rect(side, side, color)
}

// =============================================================================
// Deterministic Mock Fetcher with Request Tracking
// =============================================================================

/// Serves a tile whose gray level is derived from the request offsets, so
/// two runs against the same source produce byte-identical tiles and
/// different coordinates produce distinguishable ones.
pub struct DeterministicFetcher {
    side: u32,
    requests: RefCell<Vec<(u32, u32)>>,
}

impl DeterministicFetcher {
    pub fn new(side: u32) -> Self {
        Self {
            side,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn requests(&self) -> Vec<(u32, u32)> {
        self.requests.borrow().clone()
    }

    pub fn reset_tracking(&self) {
        self.requests.borrow_mut().clear();
    }

    /// The gray level this fetcher would serve for a source offset pair.
    /// Varies between neighboring tiles and is never zero.
    pub fn shade_for(src_xoff: u32, src_yoff: u32) -> u8 {
        (40 + (src_xoff + 3 * src_yoff) % 180) as u8
    }
}

impl TileFetcher for DeterministicFetcher {
    fn fetch(&self, request: &TileRequest) -> Result<Bytes, FetchError> {
        self.requests
            .borrow_mut()
            .push((request.src_xoff, request.src_yoff));

        let shade = Self::shade_for(request.src_xoff, request.src_yoff);
        Ok(Bytes::from(solid_jpeg(self.side, [shade, shade, shade])))
    }
}

// =============================================================================
// Failing Fetchers
// =============================================================================

/// Fails every request after the first `succeed_for` with a connection error.
pub struct FlakyFetcher {
    inner: DeterministicFetcher,
    succeed_for: usize,
}

impl FlakyFetcher {
    pub fn new(side: u32, succeed_for: usize) -> Self {
        Self {
            inner: DeterministicFetcher::new(side),
            succeed_for,
        }
    }

    pub fn request_count(&self) -> usize {
        self.inner.request_count()
    }
}

impl TileFetcher for FlakyFetcher {
    fn fetch(&self, request: &TileRequest) -> Result<Bytes, FetchError> {
        if self.inner.request_count() >= self.succeed_for {
            // Still counts as a request.
            self.inner
                .requests
                .borrow_mut()
                .push((request.src_xoff, request.src_yoff));
            return Err(FetchError::Connection("connection reset".to_string()));
        }
        self.inner.fetch(request)
    }
}

/// Serves a tile of the wrong dimensions for one specific source offset.
pub struct MisshapenFetcher {
    inner: DeterministicFetcher,
    bad_offset: (u32, u32),
    bad_dims: (u32, u32),
}

impl MisshapenFetcher {
    pub fn new(side: u32, bad_offset: (u32, u32), bad_dims: (u32, u32)) -> Self {
        Self {
            inner: DeterministicFetcher::new(side),
            bad_offset,
            bad_dims,
        }
    }
}

impl TileFetcher for MisshapenFetcher {
    fn fetch(&self, request: &TileRequest) -> Result<Bytes, FetchError> {
        if (request.src_xoff, request.src_yoff) == self.bad_offset {
            let (w, h) = self.bad_dims;
            return Ok(Bytes::from(solid_jpeg_rect(w, h, [0, 0, 0])));
        }
        self.inner.fetch(request)
    }
}
