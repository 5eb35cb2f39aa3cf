// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};
use psd::Psd;
use std::path::Path;

use super::pipeline;
use crate::domain::render::{RenderError, ThumbnailGenerator};
use crate::domain::thumbnail::HIGH_JPEG_QUALITY;

/// Layered documents, rendered from their flattened composite
pub struct LayeredImageGenerator;

#[async_trait]
impl ThumbnailGenerator for LayeredImageGenerator {
    fn name(&self) -> &'static str {
        "layered"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["psd"]
    }

    async fn generate(&self, source: &Path, target: &Path) -> Result<(), RenderError> {
        let bytes = tokio::fs::read(source).await?;
        let img = pipeline::blocking(move || flatten(&bytes)).await?;
        pipeline::finish(img, target, HIGH_JPEG_QUALITY).await
    }
}

/// Signature plus fixed-size file header
const HEADER_LEN: usize = 26;

fn flatten(bytes: &[u8]) -> Result<DynamicImage, RenderError> {
    if bytes.len() < HEADER_LEN || !bytes.starts_with(b"8BPS") {
        return Err(RenderError::Decode("missing PSD signature".to_string()));
    }
    let document = Psd::from_bytes(bytes).map_err(|e| RenderError::Decode(e.to_string()))?;
    let (width, height) = (document.width(), document.height());
    let composite = RgbaImage::from_raw(width, height, document.rgba()).ok_or_else(|| {
        RenderError::Decode(format!("composite does not match {}x{}", width, height))
    })?;
    Ok(DynamicImage::ImageRgba8(composite))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_document_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("art.psd");
        tokio::fs::write(&source, b"GIF89a this is some other format entirely").await.unwrap();
        let target = dir.path().join("art.psd.jpg");

        let err = LayeredImageGenerator.generate(&source, &target).await.unwrap_err();
        assert!(matches!(err, RenderError::Decode(_)));
        assert!(!target.exists());
    }
}
