// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use lofty::picture::PictureType;
use lofty::prelude::*;
use std::path::Path;

use super::pipeline;
use crate::domain::render::{RenderError, ThumbnailGenerator};
use crate::domain::thumbnail::DEFAULT_JPEG_QUALITY;

/// Embedded cover art of tagged audio containers
pub struct AudioCoverGenerator;

#[async_trait]
impl ThumbnailGenerator for AudioCoverGenerator {
    fn name(&self) -> &'static str {
        "audio"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["mp3", "ogg", "flac", "m4a"]
    }

    async fn generate(&self, source: &Path, target: &Path) -> Result<(), RenderError> {
        // Surface a plain io NotFound before handing the path to the tag reader
        tokio::fs::metadata(source).await?;

        let source = source.to_path_buf();
        let img = pipeline::blocking(move || {
            let artwork = extract_cover(&source)?;
            pipeline::decode(&artwork)
        })
        .await?;
        pipeline::finish(img, target, DEFAULT_JPEG_QUALITY).await
    }
}

/// Front cover if tagged as such, otherwise the first picture of the primary tag
fn extract_cover(source: &Path) -> Result<Vec<u8>, RenderError> {
    let tagged = lofty::read_from_path(source).map_err(|e| RenderError::Decode(e.to_string()))?;

    let tag = tagged
        .primary_tag()
        .or_else(|| tagged.first_tag())
        .ok_or_else(|| RenderError::NoEmbeddedArtwork(source.to_path_buf()))?;

    let pictures = tag.pictures();
    let picture = pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())
        .ok_or_else(|| RenderError::NoEmbeddedArtwork(source.to_path_buf()))?;

    Ok(picture.data().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_source_is_io_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = AudioCoverGenerator
            .generate(&dir.path().join("gone.mp3"), &dir.path().join("gone.mp3.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_untagged_file_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("noise.flac");
        tokio::fs::write(&source, b"this is not a flac stream").await.unwrap();
        let target = dir.path().join("noise.flac.jpg");

        assert!(AudioCoverGenerator.generate(&source, &target).await.is_err());
        assert!(!target.exists());
    }
}
