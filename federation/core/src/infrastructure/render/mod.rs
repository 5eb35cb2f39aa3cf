// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Thumbnail generators for each supported media family.

pub mod audio;
pub mod layered;
pub mod model;
pub mod pipeline;
pub mod raster;
pub mod video;

use std::sync::Arc;

use crate::application::render_dispatcher::GeneratorRegistry;
use crate::domain::node_config::RenderConfig;

pub use audio::AudioCoverGenerator;
pub use layered::LayeredImageGenerator;
pub use model::ModelPreviewGenerator;
pub use raster::RasterImageGenerator;
pub use video::VideoFrameGenerator;

/// Registry holding every built-in generator
pub fn builtin_generators(config: &RenderConfig) -> GeneratorRegistry {
    GeneratorRegistry::new()
        .with(Arc::new(AudioCoverGenerator))
        .with(Arc::new(RasterImageGenerator::new(config.max_image_bytes)))
        .with(Arc::new(VideoFrameGenerator::new(config.ffmpeg_path.clone())))
        .with(Arc::new(ModelPreviewGenerator))
        .with(Arc::new(LayeredImageGenerator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_extensions() {
        let registry = builtin_generators(&RenderConfig::default());

        for (ext, family) in [
            ("mp3", "audio"),
            ("flac", "audio"),
            ("jpeg", "image"),
            ("png", "image"),
            ("rmvb", "video"),
            ("ogv", "video"),
            ("stl", "model"),
            ("obj", "model"),
            ("psd", "layered"),
        ] {
            assert_eq!(registry.get(ext).map(|g| g.name()), Some(family), "{}", ext);
        }
        assert!(registry.get("txt").is_none());
    }
}
