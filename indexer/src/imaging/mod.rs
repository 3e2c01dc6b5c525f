//! Image preparation and content fingerprint
//!
//! The identifier written to each file is derived from decoded pixel data,
//! not file bytes, so writing metadata never changes it:
//!
//! - `px1:<sha256>` over width, height, colour type and raw pixel buffer
//! - `fb1:<sha256>` over the file bytes, for files that cannot be decoded
//!
//! RAW files the `image` crate cannot read fall back to their largest
//! embedded JPEG preview.

mod embedded;

pub use embedded::largest_preview;

use crate::core::{IndexError, IndexResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::Path;
use vision_client::ImagePayload;

pub const PIXEL_PREFIX: &str = "px1:";
pub const BYTES_PREFIX: &str = "fb1:";

/// Image ready to be sent to the model
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub identifier: String,
    pub payload: ImagePayload,
    /// Size of the decoded source, before resizing
    pub width: u32,
    pub height: u32,
}

/// Decode, fingerprint, resize and encode in one pass
///
/// Blocking; run it on the blocking pool.
pub fn prepare(path: &Path, max_dimension: u32) -> IndexResult<PreparedImage> {
    let bytes = std::fs::read(path).map_err(|e| IndexError::io(path, e))?;
    let img = decode(path, &bytes)?;
    let identifier = pixel_fingerprint(&img);

    let (width, height) = (img.width(), img.height());
    let resized = if width > max_dimension || height > max_dimension {
        img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
    } else {
        img
    };

    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(resized.to_rgb8())
        .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .map_err(|e| IndexError::Image {
            path: path.to_path_buf(),
            reason: format!("JPEG encode: {}", e),
            identifier: Some(identifier.clone()),
        })?;

    Ok(PreparedImage {
        identifier,
        payload: ImagePayload::jpeg(STANDARD.encode(&jpeg)),
        width,
        height,
    })
}

/// Identifier of a file without preparing a payload
pub fn fingerprint(path: &Path) -> IndexResult<String> {
    let bytes = std::fs::read(path).map_err(|e| IndexError::io(path, e))?;
    let img = decode(path, &bytes)?;
    Ok(pixel_fingerprint(&img))
}

fn decode(path: &Path, bytes: &[u8]) -> IndexResult<DynamicImage> {
    let direct = match image::load_from_memory(bytes) {
        Ok(img) => return Ok(img),
        Err(e) => e,
    };
    if let Some(preview) = largest_preview(bytes) {
        tracing::debug!(path = %path.display(), "Using embedded preview");
        return Ok(preview);
    }
    Err(IndexError::Image {
        path: path.to_path_buf(),
        reason: direct.to_string(),
        identifier: Some(bytes_fingerprint(bytes)),
    })
}

/// `px1:` identifier over decoded pixels
pub fn pixel_fingerprint(img: &DynamicImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(img.width().to_le_bytes());
    hasher.update(img.height().to_le_bytes());
    hasher.update(format!("{:?}", img.color()).as_bytes());
    hasher.update(img.as_bytes());
    format!("{}{}", PIXEL_PREFIX, hex::encode(hasher.finalize()))
}

/// `fb1:` identifier over raw file bytes
pub fn bytes_fingerprint(bytes: &[u8]) -> String {
    format!("{}{}", BYTES_PREFIX, hex::encode(Sha256::digest(bytes)))
}

/// Whether an identifier can be recomputed and compared
pub fn is_pixel_identifier(identifier: &str) -> bool {
    identifier.starts_with(PIXEL_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_png(path: &Path, width: u32, height: u32, shade: u8) {
        let img = RgbaImage::from_pixel(width, height, Rgba([shade, 64, 200, 255]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_identifier_stable_and_content_based() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a, 32, 24, 10);
        write_png(&b, 32, 24, 10);

        let first = fingerprint(&a).unwrap();
        assert!(first.starts_with(PIXEL_PREFIX));
        assert_eq!(fingerprint(&a).unwrap(), first);
        // same pixels under another name
        assert_eq!(fingerprint(&b).unwrap(), first);

        write_png(&b, 32, 24, 11);
        assert_ne!(fingerprint(&b).unwrap(), first);
    }

    #[test]
    fn test_prepare_resizes_and_encodes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.png");
        write_png(&path, 1000, 500, 90);

        let prepared = prepare(&path, 448).unwrap();
        assert_eq!((prepared.width, prepared.height), (1000, 500));
        assert_eq!(prepared.payload.mime, "image/jpeg");

        let jpeg = STANDARD.decode(&prepared.payload.base64).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (448, 224));
        assert_eq!(prepared.identifier, fingerprint(&path).unwrap());
    }

    #[test]
    fn test_undecodable_file_gets_byte_identifier() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();

        match prepare(&path, 448) {
            Err(IndexError::Image { identifier, .. }) => {
                let identifier = identifier.unwrap();
                assert!(identifier.starts_with(BYTES_PREFIX));
                assert!(!is_pixel_identifier(&identifier));
            }
            other => panic!("expected image error, got {:?}", other.map(|p| p.identifier)),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            fingerprint(&dir.path().join("missing.png")),
            Err(IndexError::Io { .. })
        ));
    }
}
