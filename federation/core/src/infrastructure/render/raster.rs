// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::path::Path;

use super::pipeline;
use crate::domain::render::{RenderError, ThumbnailGenerator};
use crate::domain::thumbnail::DEFAULT_JPEG_QUALITY;

/// Raster images decoded in-process
pub struct RasterImageGenerator {
    max_bytes: u64,
}

impl RasterImageGenerator {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

#[async_trait]
impl ThumbnailGenerator for RasterImageGenerator {
    fn name(&self) -> &'static str {
        "image"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["png", "jpg", "jpeg", "gif", "bmp", "webp"]
    }

    async fn generate(&self, source: &Path, target: &Path) -> Result<(), RenderError> {
        let size = tokio::fs::metadata(source).await?.len();
        if size > self.max_bytes {
            return Err(RenderError::SourceTooLarge {
                path: source.to_path_buf(),
                size,
                limit: self.max_bytes,
            });
        }

        let bytes = tokio::fs::read(source).await?;
        let img = pipeline::blocking(move || pipeline::decode(&bytes)).await?;
        pipeline::finish(img, target, DEFAULT_JPEG_QUALITY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    #[tokio::test]
    async fn test_png_to_square_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("wide.png");
        RgbaImage::from_pixel(900, 300, Rgba([0, 128, 255, 255]))
            .save(&source)
            .unwrap();
        let target = dir.path().join("wide.png.jpg");

        RasterImageGenerator::new(25 * 1024 * 1024)
            .generate(&source, &target)
            .await
            .unwrap();

        let thumb = image::open(&target).unwrap();
        assert_eq!(thumb.dimensions(), (480, 480));
    }

    #[tokio::test]
    async fn test_oversized_source_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("big.png");
        tokio::fs::write(&source, vec![0u8; 64]).await.unwrap();

        let err = RasterImageGenerator::new(16)
            .generate(&source, &dir.path().join("big.png.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::SourceTooLarge { size: 64, limit: 16, .. }));
    }

    #[tokio::test]
    async fn test_garbage_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.jpg");
        tokio::fs::write(&source, b"definitely not an image").await.unwrap();

        let err = RasterImageGenerator::new(1024)
            .generate(&source, &dir.path().join("broken.jpg.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Decode(_)));
    }
}
