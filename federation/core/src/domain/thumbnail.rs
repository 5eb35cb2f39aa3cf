// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Thumbnail cache entry rules: where a cache file lives and when it is fresh.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Edge length in pixels of every generated thumbnail
pub const THUMBNAIL_EDGE: u32 = 480;

/// Suffix appended to the source base name to form the cache file name
pub const CACHE_SUFFIX: &str = ".jpg";

/// JPEG quality for photographic sources (image, audio cover, video frame)
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// JPEG quality for model previews and layered images
pub const HIGH_JPEG_QUALITY: u8 = 90;

/// Suffix of the hidden sibling a cache file is written to before it is renamed into place
pub const PARTIAL_SUFFIX: &str = ".partial";

/// `<output_dir>/<basename(source)>.jpg`
pub fn cache_path(output_dir: &Path, source: &Path) -> PathBuf {
    let mut file_name = source
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    file_name.push(CACHE_SUFFIX);
    output_dir.join(file_name)
}

/// A cache file is fresh only when strictly newer than its source
pub fn is_fresh(cache_modified: SystemTime, source_modified: SystemTime) -> bool {
    cache_modified > source_modified
}

/// Lower-cased extension of a source path, without the dot
pub fn source_extension(source: &Path) -> Option<String> {
    source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Strip the cache suffix from a thumbnail-namespace path, if present
pub fn strip_cache_suffix(path: &str) -> Option<&str> {
    path.strip_suffix(CACHE_SUFFIX)
        .filter(|stripped| !stripped.is_empty() && !stripped.ends_with('/'))
}

/// Hidden in-progress name for the cache file `cache_name`
pub fn partial_name(cache_name: &str) -> String {
    format!(".{}{}", cache_name, PARTIAL_SUFFIX)
}

pub fn is_partial_name(name: &str) -> bool {
    name.len() > 1 + PARTIAL_SUFFIX.len() && name.starts_with('.') && name.ends_with(PARTIAL_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cache_path_appends_suffix() {
        let out = cache_path(Path::new("/thumbs/photos"), Path::new("/srv/a/photos/img.jpg"));
        assert_eq!(out, PathBuf::from("/thumbs/photos/img.jpg.jpg"));
    }

    #[test]
    fn test_freshness_is_strict() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        assert!(!is_fresh(t, t));
        assert!(is_fresh(t + Duration::from_millis(1), t));
        assert!(!is_fresh(t, t + Duration::from_secs(1)));
    }

    #[test]
    fn test_source_extension_lowercases() {
        assert_eq!(source_extension(Path::new("a/B.PNG")).as_deref(), Some("png"));
        assert_eq!(source_extension(Path::new("a/noext")), None);
    }

    #[test]
    fn test_partial_names() {
        assert_eq!(partial_name("img.png.jpg"), ".img.png.jpg.partial");
        assert!(is_partial_name(&partial_name("img.png.jpg")));
        assert!(!is_partial_name("img.png.jpg"));
        assert!(!is_partial_name("notes.partial"));
        assert!(!is_partial_name(".partial"));
    }

    #[test]
    fn test_strip_cache_suffix() {
        assert_eq!(strip_cache_suffix("/diskA/img.png.jpg"), Some("/diskA/img.png"));
        assert_eq!(strip_cache_suffix("/diskA/.jpg"), None);
        assert_eq!(strip_cache_suffix("/diskA/img.png"), None);
    }
}
