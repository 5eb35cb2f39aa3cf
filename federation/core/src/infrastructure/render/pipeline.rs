// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shared resize, crop, encode and atomic-write steps used by every generator.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::{Path, PathBuf};

use crate::domain::render::RenderError;
use crate::domain::thumbnail::{partial_name, THUMBNAIL_EDGE};

/// Aspect-preserving Lanczos resize so the short edge is 480, then a centered 480x480 crop
pub fn square_thumbnail(img: &DynamicImage) -> DynamicImage {
    img.resize_to_fill(THUMBNAIL_EDGE, THUMBNAIL_EDGE, FilterType::Lanczos3)
}

/// Encode as baseline RGB JPEG
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, RenderError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&rgb)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(buf)
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, RenderError> {
    image::load_from_memory(bytes).map_err(|e| RenderError::Decode(e.to_string()))
}

/// Write to a hidden sibling and rename over `target`
pub async fn write_atomic(target: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    let partial = partial_path(target);
    if let Err(e) = tokio::fs::write(&partial, bytes).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&partial, target).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    Ok(())
}

fn partial_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(partial_name(&name))
}

/// Run CPU-bound image work off the async executor
pub async fn blocking<T, F>(work: F) -> Result<T, RenderError>
where
    F: FnOnce() -> Result<T, RenderError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| RenderError::TaskFailed(e.to_string()))?
}

/// Crop, encode and store a decoded image
pub async fn finish(img: DynamicImage, target: &Path, quality: u8) -> Result<(), RenderError> {
    let bytes = blocking(move || encode_jpeg(&square_thumbnail(&img), quality)).await?;
    write_atomic(target, &bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    #[test]
    fn test_square_thumbnail_from_landscape_and_portrait() {
        for (w, h) in [(1200u32, 300u32), (200, 900), (480, 480), (64, 32)] {
            let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([10, 20, 30])));
            let thumb = square_thumbnail(&img);
            assert_eq!(thumb.dimensions(), (480, 480), "source {}x{}", w, h);
        }
    }

    #[test]
    fn test_encode_produces_decodable_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(480, 480, Rgb([200, 0, 0])));
        let bytes = encode_jpeg(&img, 75).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (480, 480));
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_target_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.png.jpg");
        tokio::fs::write(&target, b"old").await.unwrap();

        write_atomic(&target, b"new").await.unwrap();

        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"new");
        assert!(!partial_path(&target).exists());
    }
}
