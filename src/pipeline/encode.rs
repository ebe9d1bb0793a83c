//! Image encoding: column crop → base64 PNG wrapped in `ImageData`.
//!
//! PNG keeps pen strokes crisp; JPEG ringing around thin handwriting is
//! enough to turn a `6` into a `b`. `detail: "high"` keeps the recogniser
//! from downscaling a narrow column to a single low-resolution tile.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::io::Cursor;
use tracing::debug;

use crate::raster::RasterImage;

/// Encode one column image for the recogniser request body.
pub fn encode_column(img: &RasterImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.as_dynamic()
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        width = img.width(),
        height = img.height(),
        bytes = b64.len(),
        "encoded column"
    );

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// PNG bytes of `img`, for debug artefacts written by callers.
pub fn png_bytes(img: &RasterImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.as_dynamic()
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}
