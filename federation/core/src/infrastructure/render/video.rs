// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::pipeline;
use crate::domain::render::{RenderError, ThumbnailGenerator};
use crate::domain::thumbnail::{DEFAULT_JPEG_QUALITY, THUMBNAIL_EDGE};

/// Seek offset of the extracted frame
const FRAME_OFFSET: &str = "00:00:05.000";

/// Single frame pulled by an external ffmpeg process
pub struct VideoFrameGenerator {
    ffmpeg: String,
}

impl VideoFrameGenerator {
    pub fn new(ffmpeg: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Frame at the offset, scaled so the short edge is 480, as PNG on stdout
    fn command(&self, source: &Path) -> Command {
        let scale = format!(
            "scale=w={edge}:h={edge}:force_original_aspect_ratio=increase",
            edge = THUMBNAIL_EDGE
        );
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-hide_banner", "-loglevel", "error", "-ss", FRAME_OFFSET, "-i"])
            .arg(source)
            .args(["-frames:v", "1", "-vf", &scale])
            .args(["-f", "image2pipe", "-vcodec", "png", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ThumbnailGenerator for VideoFrameGenerator {
    fn name(&self) -> &'static str {
        "video"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["mkv", "mp4", "webm", "ogv", "avi", "rmvb", "mov"]
    }

    async fn generate(&self, source: &Path, target: &Path) -> Result<(), RenderError> {
        tokio::fs::metadata(source).await?;

        let output = self
            .command(source)
            .output()
            .await
            .map_err(|e| RenderError::Tool(format!("failed to run {}: {}", self.ffmpeg, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Tool(format!(
                "{} exited with {}: {}",
                self.ffmpeg,
                output.status,
                stderr.trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(RenderError::Tool(format!(
                "{} produced no frame at {}",
                self.ffmpeg, FRAME_OFFSET
            )));
        }

        let frame = output.stdout;
        let img = pipeline::blocking(move || pipeline::decode(&frame)).await?;
        pipeline::finish(img, target, DEFAULT_JPEG_QUALITY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_tool_is_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        tokio::fs::write(&source, b"\x00\x00\x00\x18ftypmp42").await.unwrap();
        let target = dir.path().join("clip.mp4.jpg");

        let err = VideoFrameGenerator::new("/nonexistent/bin/ffmpeg-for-tests")
            .generate(&source, &target)
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::Tool(_)));
        assert!(!target.exists());
    }

    #[test]
    fn test_command_seeks_before_input() {
        let generator = VideoFrameGenerator::new("ffmpeg");
        let cmd = generator.command(Path::new("/srv/a/clip.mkv"));
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
        assert_eq!(args[input + 1], "/srv/a/clip.mkv");
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }
}
