// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Path Sanitizer Domain Service
//!
//! Normalizes the slash-separated virtual paths that arrive from protocol
//! clients and splits them into mount prefix, worker segment and the
//! worker-relative remainder. Any `..` component is rejected outright so a
//! relative path can never climb out of a worker's backing directory.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements internal responsibilities for path sanitizer

use std::path::PathBuf;
use thiserror::Error;

/// Path sanitization errors
#[derive(Debug, Error)]
pub enum PathSanitizerError {
    #[error("Path traversal attempt detected: {0}")]
    PathTraversal(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path outside worker boundary: {0}")]
    OutsideBoundary(String),

    #[error("Path too long: {0}")]
    PathTooLong(String),
}

/// Path sanitizer domain service
///
/// # Guarantees
/// - Rejects paths containing `..` components or NUL bytes
/// - Normalizes separators (`\` becomes `/`) and collapses `//` and `.`
/// - Canonical form always starts with exactly one `/` and never ends with one
///   (the root is `/`)
pub struct PathSanitizer {
    /// Maximum allowed path length (default: 4096)
    max_path_len: usize,
}

impl PathSanitizer {
    pub fn new() -> Self {
        Self { max_path_len: 4096 }
    }

    pub fn with_max_length(max_path_len: usize) -> Self {
        Self { max_path_len }
    }

    /// Canonicalize and validate a virtual path
    ///
    /// # Examples
    /// ```
    /// use nasfed_core::domain::path_sanitizer::PathSanitizer;
    ///
    /// let sanitizer = PathSanitizer::new();
    /// assert_eq!(sanitizer.canonicalize("diskA//photos/./img.jpg").unwrap(), "/diskA/photos/img.jpg");
    /// assert!(sanitizer.canonicalize("/diskA/../etc/passwd").is_err());
    /// ```
    pub fn canonicalize(&self, path: &str) -> Result<String, PathSanitizerError> {
        self.validate(path)?;

        let mut segments = Vec::new();
        for segment in path.split(['/', '\\']) {
            match segment {
                "" | "." => continue,
                ".." => {
                    tracing::warn!(
                        path = %path,
                        "Path traversal attempt detected: contains '..' component"
                    );
                    return Err(PathSanitizerError::PathTraversal(path.to_string()));
                }
                part => segments.push(part),
            }
        }

        Ok(format!("/{}", segments.join("/")))
    }

    /// Lightweight validation without normalizing
    pub fn validate(&self, path: &str) -> Result<(), PathSanitizerError> {
        if path.len() > self.max_path_len {
            return Err(PathSanitizerError::PathTooLong(path.to_string()));
        }

        if path.contains('\0') {
            tracing::warn!(
                path = %path,
                "Path contains null byte (potential security issue)"
            );
            return Err(PathSanitizerError::InvalidPath(
                "Path contains null byte".to_string(),
            ));
        }

        Ok(())
    }

    /// Remove a router mount prefix (e.g. `/disk/`) from an incoming path
    ///
    /// An empty remainder is the namespace root `/`. Paths that do not carry
    /// the prefix are taken as already relative to the mount.
    pub fn strip_mount_prefix(&self, path: &str, prefix: &str) -> String {
        let bare_prefix = prefix.trim_end_matches('/');
        if path.is_empty() || path == prefix || path == bare_prefix {
            return "/".to_string();
        }

        let stripped = path.strip_prefix(prefix).unwrap_or(path);
        if stripped.starts_with('/') {
            stripped.to_string()
        } else {
            format!("/{}", stripped)
        }
    }

    /// Strip a worker's node segment and return the worker-relative path
    ///
    /// `/diskA/photos/img.jpg` with node `/diskA` yields `photos/img.jpg`;
    /// `/diskA` yields an empty path (the worker root).
    pub fn strip_node_name(
        &self,
        path: &str,
        node_name: &str,
    ) -> Result<PathBuf, PathSanitizerError> {
        let canonical = self.canonicalize(path)?;
        let node = node_name.trim_start_matches('/');

        let mut segments = canonical.trim_start_matches('/').split('/');
        match segments.next() {
            Some(first) if first == node => {}
            _ => {
                tracing::warn!(
                    path = %path,
                    node = %node_name,
                    "Path outside worker boundary detected"
                );
                return Err(PathSanitizerError::OutsideBoundary(path.to_string()));
            }
        }

        Ok(segments.filter(|s| !s.is_empty()).collect())
    }
}

impl Default for PathSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// First segment of a canonical path (`/diskA/x` gives `diskA`), `None` for the root
pub fn first_segment(canonical: &str) -> Option<&str> {
    canonical
        .trim_start_matches('/')
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty())
}

/// True when a canonical path names the namespace root or a single top-level segment
pub fn is_top_level(canonical: &str) -> bool {
    !canonical.trim_start_matches('/').contains('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_simple_path() {
        let sanitizer = PathSanitizer::new();
        let result = sanitizer.canonicalize("/diskA/file.txt");
        assert_eq!(result.unwrap(), "/diskA/file.txt");
    }

    #[test]
    fn test_reject_parent_dir() {
        let sanitizer = PathSanitizer::new();
        let result = sanitizer.canonicalize("/diskA/../etc/passwd");
        assert!(matches!(
            result.unwrap_err(),
            PathSanitizerError::PathTraversal(_)
        ));
    }

    #[test]
    fn test_normalize_current_dir_and_separators() {
        let sanitizer = PathSanitizer::new();
        assert_eq!(
            sanitizer.canonicalize("diskA/./sub//dir\\file.txt/").unwrap(),
            "/diskA/sub/dir/file.txt"
        );
        assert_eq!(sanitizer.canonicalize("").unwrap(), "/");
        assert_eq!(sanitizer.canonicalize("///").unwrap(), "/");
    }

    #[test]
    fn test_path_too_long() {
        let sanitizer = PathSanitizer::with_max_length(10);
        let result = sanitizer.canonicalize("/very/long/path/that/exceeds/limit");
        assert!(matches!(
            result.unwrap_err(),
            PathSanitizerError::PathTooLong(_)
        ));
    }

    #[test]
    fn test_validate_null_byte() {
        let sanitizer = PathSanitizer::new();
        assert!(sanitizer.validate("/diskA/file.txt").is_ok());
        assert!(sanitizer.validate("/path\0/with/null").is_err());
    }

    #[test]
    fn test_strip_mount_prefix() {
        let sanitizer = PathSanitizer::new();
        assert_eq!(sanitizer.strip_mount_prefix("/disk/", "/disk/"), "/");
        assert_eq!(sanitizer.strip_mount_prefix("/disk", "/disk/"), "/");
        assert_eq!(sanitizer.strip_mount_prefix("", "/disk/"), "/");
        assert_eq!(
            sanitizer.strip_mount_prefix("/disk/diskA/photos", "/disk/"),
            "/diskA/photos"
        );
        assert_eq!(
            sanitizer.strip_mount_prefix("/diskA/photos", "/disk/"),
            "/diskA/photos"
        );
    }

    #[test]
    fn test_strip_node_name() {
        let sanitizer = PathSanitizer::new();
        let rel = sanitizer
            .strip_node_name("/diskA/photos/img.jpg", "/diskA")
            .unwrap();
        assert_eq!(rel, Path::new("photos/img.jpg"));

        let root = sanitizer.strip_node_name("/diskA/", "/diskA").unwrap();
        assert_eq!(root, PathBuf::new());
    }

    #[test]
    fn test_strip_node_name_does_not_match_longer_segment() {
        let sanitizer = PathSanitizer::new();
        let result = sanitizer.strip_node_name("/diskAB/file", "/diskA");
        assert!(matches!(
            result.unwrap_err(),
            PathSanitizerError::OutsideBoundary(_)
        ));
    }

    #[test]
    fn test_segment_helpers() {
        assert_eq!(first_segment("/diskA/photos"), Some("diskA"));
        assert_eq!(first_segment("/"), None);
        assert!(is_top_level("/"));
        assert!(is_top_level("/diskA"));
        assert!(!is_top_level("/diskA/photos"));
    }
}
