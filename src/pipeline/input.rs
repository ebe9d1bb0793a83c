//! Input resolution: load a page image from a local path or a URL.
//!
//! Images are sniffed by their magic bytes rather than the file extension,
//! so a phone upload named `sheet.dat` still works and an HTML error page
//! served under `sheet.png` fails with a clear message instead of a
//! decoder panic deep in the pipeline.

use crate::error::ScanError;
use crate::raster::RasterImage;
use image::ImageFormat;
use std::path::PathBuf;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load one page image.
///
/// If the input is a URL it is downloaded; otherwise it is read from disk.
pub async fn load_image(input: &str, timeout_secs: u64) -> Result<RasterImage, ScanError> {
    let bytes = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    let label = input.to_string();
    tokio::task::spawn_blocking(move || decode_image(&bytes, &label))
        .await
        .map_err(|e| ScanError::Internal(format!("decode task panicked: {e}")))?
}

/// Decode PNG or JPEG bytes. `label` names the source in errors.
pub fn decode_image(bytes: &[u8], label: &str) -> Result<RasterImage, ScanError> {
    let format = match image::guess_format(bytes) {
        Ok(f @ (ImageFormat::Png | ImageFormat::Jpeg)) => f,
        _ => {
            return Err(ScanError::NotAnImage {
                input: label.to_string(),
            })
        }
    };
    let image = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        ScanError::ImageDecode {
            input: label.to_string(),
            detail: e.to_string(),
        }
    })?;
    debug!(
        "Decoded {}: {:?} {}x{}",
        label,
        format,
        image.width(),
        image.height()
    );
    Ok(RasterImage::new(image))
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, ScanError> {
    let path = PathBuf::from(path_str);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(ScanError::PermissionDenied { path })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ScanError::FileNotFound { path }),
        Err(_) if path_str.contains("://") => Err(ScanError::InvalidInput {
            input: path_str.to_string(),
        }),
        Err(_) => Err(ScanError::FileNotFound { path }),
    }
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, ScanError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ScanError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ScanError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ScanError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ScanError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ScanError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::png_bytes;
    use image::{GrayImage, Luma};

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/sheet.png"));
        assert!(is_url("http://example.com/sheet.jpg"));
        assert!(!is_url("/tmp/sheet.png"));
        assert!(!is_url("sheet.png"));
        assert!(!is_url(""));
    }

    #[tokio::test]
    async fn loads_png_regardless_of_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.dat");
        let img = RasterImage::from(GrayImage::from_pixel(30, 20, Luma([200])));
        std::fs::write(&path, png_bytes(&img).unwrap()).unwrap();

        let loaded = load_image(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!((loaded.width(), loaded.height()), (30, 20));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = load_image("/definitely/not/here.png", 5).await.unwrap_err();
        assert!(matches!(err, ScanError::FileNotFound { .. }), "got: {err}");
    }

    #[test]
    fn non_image_bytes_are_rejected() {
        let err = decode_image(b"%PDF-1.7 not an image", "sheet.png").unwrap_err();
        assert!(matches!(err, ScanError::NotAnImage { .. }), "got: {err}");
    }

    #[test]
    fn truncated_png_fails_to_decode() {
        let img = RasterImage::from(GrayImage::from_pixel(30, 20, Luma([0])));
        let bytes = png_bytes(&img).unwrap();
        let err = decode_image(&bytes[..40], "cut.png").unwrap_err();
        assert!(matches!(err, ScanError::ImageDecode { .. }), "got: {err}");
    }
}
