//! Image payloads: rasterised pages, reference images, and generated results.
//!
//! [`ImageData`] is the one image type that crosses every boundary in the
//! crate. The bytes are kept encoded (JPEG/PNG/WebP) in a [`Bytes`] buffer so
//! a page image can be attached to a request, kept in the run state, and
//! threaded forward as the next page's reference without copying.

use crate::error::RedesignError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// An encoded image with its MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    pub mime_type: String,
    pub bytes: Bytes,
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageData {
    pub fn new(mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Standard base64 of the raw bytes, as the API's `inlineData.data` expects.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// Decode a base64 payload received from the API.
    pub fn from_base64(mime_type: impl Into<String>, data: &str) -> Result<Self, RedesignError> {
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| RedesignError::Internal(format!("invalid base64 image data: {e}")))?;
        Ok(Self::new(mime_type, bytes))
    }

    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

/// Encode a rasterised page as JPEG at `quality` (1–100).
///
/// JPEG has no alpha channel, so the page is flattened to RGB first; pdfium
/// renders pages onto an opaque white background, so nothing is lost.
pub fn encode_page(img: &DynamicImage, quality: u8) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
    debug!("Encoded page image → {} bytes JPEG", buf.len());
    Ok(ImageData::new("image/jpeg", buf))
}

/// Load a reference image from disk, detecting its format from the content.
pub async fn load_image_file(path: &Path) -> Result<ImageData, RedesignError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RedesignError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => RedesignError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => RedesignError::UnsupportedImage {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    })?;

    let format = image::guess_format(&bytes).map_err(|e| RedesignError::UnsupportedImage {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    Ok(ImageData::new(format.to_mime_type(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn encode_small_page_as_jpeg() {
        let data = encode_page(&red_square(), 80).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/jpeg");
        assert_eq!(data.extension(), "jpg");
        // JPEG SOI marker
        assert_eq!(&data.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn debug_does_not_dump_bytes() {
        let data = ImageData::new("image/png", vec![0u8; 4096]);
        let dbg = format!("{data:?}");
        assert!(dbg.contains("4096"));
        assert!(dbg.len() < 100);
    }

    #[tokio::test]
    async fn load_image_file_detects_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.bin");
        red_square()
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let data = load_image_file(&path).await.unwrap();
        assert_eq!(data.mime_type, "image/png");
        assert!(!data.is_empty());
    }

    #[tokio::test]
    async fn load_image_file_missing() {
        let err = load_image_file(Path::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, RedesignError::FileNotFound { .. }));
    }
}
