//! Cover image normalization
//!
//! Covers are decoded, shrunk to fit the configured bounds and re-encoded as
//! PNG `data:` URIs before they are stored. Images already inside the bounds
//! keep their dimensions but are still re-encoded.

use crate::{CatalogError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures_util::future::try_join_all;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use questlog_config::ImageConfig;
use std::io::Cursor;

const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// A cover ready for storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub width: u32,
    pub height: u32,
    pub data_uri: String,
}

/// Decode, resize and re-encode pipeline for cover art
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePipeline {
    max_width: u32,
    max_height: u32,
}

impl Default for ImagePipeline {
    fn default() -> Self {
        Self::from(ImageConfig::default())
    }
}

impl From<ImageConfig> for ImagePipeline {
    fn from(config: ImageConfig) -> Self {
        Self::new(config.max_width, config.max_height)
    }
}

impl ImagePipeline {
    /// Create a pipeline with the given bounds (each at least 1 pixel)
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width: max_width.max(1),
            max_height: max_height.max(1),
        }
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    pub fn max_height(&self) -> u32 {
        self.max_height
    }

    /// Normalize one cover on the blocking pool
    pub async fn normalize(&self, bytes: Vec<u8>) -> Result<NormalizedImage> {
        let pipeline = *self;

        tokio::task::spawn_blocking(move || pipeline.normalize_blocking(&bytes))
            .await
            .map_err(|e| CatalogError::Decode(format!("image task failed: {e}")))?
    }

    /// Normalize several covers concurrently, failing on the first bad one
    pub async fn normalize_many(&self, payloads: Vec<Vec<u8>>) -> Result<Vec<NormalizedImage>> {
        try_join_all(payloads.into_iter().map(|bytes| self.normalize(bytes))).await
    }

    /// Synchronous body of [`ImagePipeline::normalize`]
    pub fn normalize_blocking(&self, bytes: &[u8]) -> Result<NormalizedImage> {
        if bytes.is_empty() {
            return Err(CatalogError::Decode("image payload is empty".to_string()));
        }

        let decoded =
            image::load_from_memory(bytes).map_err(|e| CatalogError::Decode(e.to_string()))?;
        let (source_width, source_height) = (decoded.width(), decoded.height());
        let (width, height) =
            target_dimensions(source_width, source_height, self.max_width, self.max_height);

        let resized = if (width, height) == (source_width, source_height) {
            decoded
        } else {
            decoded.resize_exact(width, height, FilterType::Triangle)
        };
        let canonical = DynamicImage::ImageRgba8(resized.to_rgba8());

        let mut png = Vec::new();
        canonical
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| CatalogError::Encode(e.to_string()))?;

        tracing::debug!(
            "Normalized cover {}x{} -> {}x{} ({} bytes)",
            source_width,
            source_height,
            width,
            height,
            png.len()
        );

        Ok(NormalizedImage {
            width,
            height,
            data_uri: format!("{DATA_URI_PREFIX}{}", STANDARD.encode(&png)),
        })
    }
}

/// Dimensions that fit `width`x`height` inside the bounds
///
/// Landscape and square images are capped by width, portrait images by
/// height. If the other side still overflows it is capped as well. Images
/// are never upscaled.
pub fn target_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let (mut w, mut h) = (width, height);

    if w >= h {
        if w > max_width {
            h = scale(h, max_width, w);
            w = max_width;
        }
    } else if h > max_height {
        w = scale(w, max_height, h);
        h = max_height;
    }

    if h > max_height {
        w = scale(w, max_height, h);
        h = max_height;
    }
    if w > max_width {
        h = scale(h, max_width, w);
        w = max_width;
    }

    (w.max(1), h.max(1))
}

/// `value * numerator / denominator`, rounded to nearest
fn scale(value: u32, numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return value;
    }
    let scaled = (u64::from(value) * u64::from(numerator) + u64::from(denominator) / 2)
        / u64::from(denominator);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// Raw bytes of a base64 `data:` URI
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| CatalogError::Decode("not a data URI".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| CatalogError::Decode("data URI has no payload".to_string()))?;

    if !header.ends_with(";base64") {
        return Err(CatalogError::Decode(format!(
            "unsupported data URI encoding: {header}"
        )));
    }

    STANDARD
        .decode(payload)
        .map_err(|e| CatalogError::Decode(e.to_string()))
}

/// Pixel dimensions of a stored cover
pub fn cover_dimensions(uri: &str) -> Result<(u32, u32)> {
    let bytes = decode_data_uri(uri)?;
    let decoded =
        image::load_from_memory(&bytes).map_err(|e| CatalogError::Decode(e.to_string()))?;
    Ok((decoded.width(), decoded.height()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 90]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    #[test]
    fn test_target_dimensions_landscape() {
        assert_eq!(target_dimensions(1600, 900, 800, 600), (800, 450));
    }

    #[test]
    fn test_target_dimensions_portrait() {
        assert_eq!(target_dimensions(300, 900, 800, 600), (200, 600));
    }

    #[test]
    fn test_target_dimensions_within_bounds() {
        assert_eq!(target_dimensions(400, 300, 800, 600), (400, 300));
        assert_eq!(target_dimensions(1, 1, 800, 600), (1, 1));
        assert_eq!(target_dimensions(800, 600, 800, 600), (800, 600));
    }

    #[test]
    fn test_target_dimensions_never_exceed_bounds() {
        // Square and near-square images would overflow the height on the width cap alone
        assert_eq!(target_dimensions(1000, 1000, 800, 600), (600, 600));
        assert_eq!(target_dimensions(1000, 900, 800, 600), (667, 600));

        for (w, h) in [(4000, 3999), (801, 601), (5000, 10), (10, 5000), (3000, 700)] {
            let (tw, th) = target_dimensions(w, h, 800, 600);
            assert!(tw <= 800 && th <= 600, "{}x{} -> {}x{}", w, h, tw, th);
            assert!(tw >= 1 && th >= 1);
        }
    }

    #[test]
    fn test_scale_rounds_to_nearest() {
        assert_eq!(scale(1000, 600, 900), 667);
        assert_eq!(scale(10, 1, 4), 3);
        assert_eq!(scale(7, 3, 0), 7);
    }

    #[test]
    fn test_normalize_shrinks_large_image() {
        let pipeline = ImagePipeline::default();
        let normalized = pipeline
            .normalize_blocking(&encoded(1000, 500, ImageFormat::Png))
            .unwrap();

        assert_eq!((normalized.width, normalized.height), (800, 400));
        assert!(normalized.data_uri.starts_with(DATA_URI_PREFIX));
        assert_eq!(cover_dimensions(&normalized.data_uri).unwrap(), (800, 400));
    }

    #[test]
    fn test_normalize_reencodes_small_image_as_png() {
        let pipeline = ImagePipeline::default();
        let jpeg = encoded(40, 30, ImageFormat::Jpeg);
        let normalized = pipeline.normalize_blocking(&jpeg).unwrap();

        assert_eq!((normalized.width, normalized.height), (40, 30));
        let bytes = decode_data_uri(&normalized.data_uri).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_normalize_rejects_empty_and_corrupt_input() {
        let pipeline = ImagePipeline::default();

        let err = pipeline.normalize_blocking(&[]).unwrap_err();
        assert!(matches!(err, CatalogError::Decode(_)));

        let err = pipeline
            .normalize_blocking(b"definitely not an image")
            .unwrap_err();
        assert!(matches!(err, CatalogError::Decode(_)));
    }

    #[test]
    fn test_custom_bounds() {
        let pipeline = ImagePipeline::new(100, 100);
        let normalized = pipeline
            .normalize_blocking(&encoded(300, 150, ImageFormat::Png))
            .unwrap();
        assert_eq!((normalized.width, normalized.height), (100, 50));

        let clamped = ImagePipeline::new(0, 0);
        assert_eq!((clamped.max_width(), clamped.max_height()), (1, 1));
    }

    #[tokio::test]
    async fn test_normalize_async() {
        let pipeline = ImagePipeline::default();
        let normalized = pipeline
            .normalize(encoded(300, 900, ImageFormat::Png))
            .await
            .unwrap();
        assert_eq!((normalized.width, normalized.height), (200, 600));
    }

    #[tokio::test]
    async fn test_normalize_many() {
        let pipeline = ImagePipeline::new(50, 50);
        let covers = pipeline
            .normalize_many(vec![
                encoded(100, 20, ImageFormat::Png),
                encoded(20, 100, ImageFormat::Png),
            ])
            .await
            .unwrap();

        assert_eq!((covers[0].width, covers[0].height), (50, 10));
        assert_eq!((covers[1].width, covers[1].height), (10, 50));

        let err = pipeline
            .normalize_many(vec![encoded(10, 10, ImageFormat::Png), Vec::new()])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Decode(_)));
    }

    #[test]
    fn test_decode_data_uri() {
        assert_eq!(
            decode_data_uri("data:image/png;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
        assert!(decode_data_uri("image/png;base64,aGVsbG8=").is_err());
        assert!(decode_data_uri("data:image/png,hello").is_err());
        assert!(decode_data_uri("data:image/png;base64").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
    }
}
