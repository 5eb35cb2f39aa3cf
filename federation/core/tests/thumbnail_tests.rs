// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the thumbnail namespace
//!
//! Uses the built-in generators, so the raster path produces real JPEGs.

use nasfed_core::application::federation::FederationService;
use nasfed_core::application::render_dispatcher::RenderDispatcher;
use nasfed_core::domain::fs::{FileSystem, FsError, FsFile, OpenFlags};
use nasfed_core::domain::node_config::RenderConfig;
use nasfed_core::domain::worker::WorkerOptions;
use nasfed_core::infrastructure::render::builtin_generators;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    service: FederationService,
    source: TempDir,
    store: TempDir,
}

fn fixture() -> Fixture {
    let source = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let dispatcher = Arc::new(RenderDispatcher::new(
        builtin_generators(&RenderConfig::default()),
        2,
    ));
    let service = FederationService::new("/disk", "/thumb", dispatcher);
    service
        .register_worker("diskA", source.path(), store.path(), WorkerOptions::default())
        .unwrap();
    Fixture { service, source, store }
}

fn write_png(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbImage::from_pixel(width, height, image::Rgb([10, 200, 30]))
        .save(path)
        .unwrap();
}

async fn read_all(file: &mut Box<dyn FsFile>) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).await.unwrap();
        if n == 0 {
            return out;
        }
        out.extend_from_slice(&buf[..n]);
    }
}

#[tokio::test]
async fn test_thumbnail_namespace_is_read_only() {
    let f = fixture();
    std::fs::create_dir(f.source.path().join("photos")).unwrap();
    let thumbs = f.service.thumbnail_filesystem();

    assert!(matches!(
        thumbs.mkdir("/thumb/diskA/photos/new", 0o755).await,
        Err(FsError::PermissionDenied(_))
    ));
    assert!(matches!(
        thumbs.rename("/thumb/diskA/photos", "/thumb/diskA/pics").await,
        Err(FsError::PermissionDenied(_))
    ));
    assert!(matches!(
        thumbs
            .open_file("/thumb/diskA/photos/x.png.jpg", OpenFlags::create_truncate(), 0o644)
            .await,
        Err(FsError::PermissionDenied(_))
    ));
    assert!(f.source.path().join("photos").is_dir());
}

#[tokio::test]
async fn test_single_file_request_renders_square_jpeg() {
    let f = fixture();
    write_png(&f.source.path().join("photos/pic.png"), 640, 320);
    let thumbs = f.service.thumbnail_filesystem();

    let mut file = thumbs
        .open_file("/thumb/diskA/photos/pic.png.jpg", OpenFlags::read_only(), 0)
        .await
        .unwrap();
    let bytes = read_all(&mut file).await;

    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!((img.width(), img.height()), (480, 480));
    assert!(f.store.path().join("photos/pic.png.jpg").is_file());

    // The source name itself resolves to the same cache entry
    let mut again = thumbs
        .open_file("/thumb/diskA/photos/pic.png", OpenFlags::read_only(), 0)
        .await
        .unwrap();
    assert_eq!(read_all(&mut again).await, bytes);
}

#[tokio::test]
async fn test_unsupported_source_is_reported() {
    let f = fixture();
    std::fs::write(f.source.path().join("notes.txt"), b"plain text").unwrap();
    let thumbs = f.service.thumbnail_filesystem();

    let result = thumbs
        .open_file("/thumb/diskA/notes.txt.jpg", OpenFlags::read_only(), 0)
        .await;
    assert!(matches!(result, Err(FsError::UnsupportedFormat(_))));
    assert!(!f.store.path().join("notes.txt.jpg").exists());
}

#[tokio::test]
async fn test_missing_source_is_not_found() {
    let f = fixture();
    let thumbs = f.service.thumbnail_filesystem();

    let result = thumbs
        .open_file("/thumb/diskA/ghost.png.jpg", OpenFlags::read_only(), 0)
        .await;
    assert!(matches!(result, Err(FsError::NotFound(_))));
}

#[tokio::test]
async fn test_directory_listing_queues_background_renders() {
    let f = fixture();
    write_png(&f.source.path().join("photos/img.png"), 100, 200);
    std::fs::create_dir_all(f.source.path().join("photos/holiday")).unwrap();
    std::fs::write(f.source.path().join("photos/readme.txt"), b"skip me").unwrap();
    let thumbs = f.service.thumbnail_filesystem();

    // The listing answers immediately, whatever has been rendered so far
    let mut dir = thumbs
        .open_file("/thumb/diskA/photos", OpenFlags::read_only(), 0)
        .await
        .unwrap();
    dir.readdir().await.unwrap();
    assert!(f.store.path().join("photos/holiday").is_dir());

    let cache = f.store.path().join("photos/img.png.jpg");
    for _ in 0..300 {
        if cache.is_file() && !f.service.dispatcher().is_in_flight(&f.source.path().join("photos/img.png")) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(cache.is_file());
    assert!(!f.store.path().join("photos/readme.txt.jpg").exists());

    let mut dir = thumbs
        .open_file("/thumb/diskA/photos", OpenFlags::read_only(), 0)
        .await
        .unwrap();
    let mut names: Vec<String> = dir
        .readdir()
        .await
        .unwrap()
        .iter()
        .map(|e| e.name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["holiday", "img.png.jpg"]);
}

#[tokio::test]
async fn test_stat_mirrors_source_directory() {
    let f = fixture();
    std::fs::create_dir_all(f.source.path().join("music/albums")).unwrap();
    let thumbs = f.service.thumbnail_filesystem();

    let info = thumbs.stat("/thumb/diskA/music/albums").await.unwrap();
    assert!(info.is_dir());
    assert_eq!(info.name(), "albums");
    assert!(f.store.path().join("music/albums").is_dir());

    assert!(matches!(
        thumbs.stat("/thumb/diskA/music/none").await,
        Err(FsError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_remove_deletes_cache_entry_only() {
    let f = fixture();
    let source = f.source.path().join("pic.png");
    write_png(&source, 64, 64);
    let thumbs = f.service.thumbnail_filesystem();

    thumbs
        .open_file("/thumb/diskA/pic.png.jpg", OpenFlags::read_only(), 0)
        .await
        .unwrap();
    let cache = f.store.path().join("pic.png.jpg");
    assert!(cache.is_file());

    thumbs.remove_all("/thumb/diskA/pic.png.jpg").await.unwrap();
    assert!(!cache.exists());
    assert!(source.is_file());

    // Already gone
    thumbs.remove_all("/thumb/diskA/pic.png.jpg").await.unwrap();
}

#[tokio::test]
async fn test_missing_directory_leaves_store_untouched() {
    let f = fixture();
    let thumbs = f.service.thumbnail_filesystem();

    let result = thumbs
        .open_file("/thumb/diskA/ghost", OpenFlags::read_only(), 0)
        .await;

    assert!(matches!(result, Err(FsError::NotFound(_))));
    assert!(!f.store.path().join("ghost").exists());
}

#[tokio::test]
async fn test_listing_hides_in_progress_cache_files() {
    let f = fixture();
    std::fs::create_dir_all(f.source.path().join("docs")).unwrap();
    std::fs::create_dir_all(f.store.path().join("docs")).unwrap();
    std::fs::write(f.store.path().join("docs/.scan.png.jpg.partial"), b"half").unwrap();
    std::fs::write(f.store.path().join("docs/scan.png.jpg"), b"done").unwrap();
    let thumbs = f.service.thumbnail_filesystem();

    let mut dir = thumbs
        .open_file("/thumb/diskA/docs", OpenFlags::read_only(), 0)
        .await
        .unwrap();
    let names: Vec<String> = dir
        .readdir()
        .await
        .unwrap()
        .iter()
        .map(|e| e.name().to_string())
        .collect();

    assert_eq!(names, vec!["scan.png.jpg"]);
}
