//! Mosaic finalizer: encode the assembled raster and release the store.
//!
//! No pixel transformation happens here. The raster's mapped bytes are
//! handed directly to the `image` encoder for the chosen display format,
//! then the store is flushed and closed. If encoding fails the raster stays
//! on disk so the run can be retried without re-fetching anything.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageFormat};
use tracing::info;

use crate::config::OutputFormat;
use crate::error::FinalizeError;
use crate::store::RasterStore;

/// Encode the raster to `path` and close the store.
///
/// JPEG output honors `quality`; PNG and BMP are lossless and ignore it.
pub fn write_mosaic(
    store: RasterStore,
    path: &Path,
    format: OutputFormat,
    quality: u8,
) -> Result<(), FinalizeError> {
    let shape = store.shape();
    info!(
        "Saving stitched image {} (raw: {:.2} MB)",
        path.display(),
        store.file_len() as f64 / 1_000_000.0
    );

    let encode_err = |message: String| FinalizeError::Encode {
        path: path.to_path_buf(),
        message,
    };

    match format {
        OutputFormat::Jpg => {
            let file = File::create(path).map_err(|e| encode_err(e.to_string()))?;
            let writer = BufWriter::new(file);
            JpegEncoder::new_with_quality(writer, quality)
                .encode(
                    store.pixels(),
                    shape.width,
                    shape.height,
                    ExtendedColorType::Rgb8,
                )
                .map_err(|e| encode_err(e.to_string()))?;
        }
        OutputFormat::Png | OutputFormat::Bmp => {
            let image_format = match format {
                OutputFormat::Png => ImageFormat::Png,
                _ => ImageFormat::Bmp,
            };
            image::save_buffer_with_format(
                path,
                store.pixels(),
                shape.width,
                shape.height,
                ExtendedColorType::Rgb8,
                image_format,
            )
            .map_err(|e| encode_err(e.to_string()))?;
        }
    }

    store.close()?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
