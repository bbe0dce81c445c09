//! Integration tests for the image source.
//!
//! These tests ingest real compressed images and fetch them back through
//! every retrieval strategy.

use pixbridge::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

fn test_image(shape: Shape) -> PixelBuffer {
    PixelBuffer::from_fn(shape, |h, w, c| (h * 5 + w * 3 + c * 70) as u8).unwrap()
}

fn new_source(dir: &Path) -> ImageSource<LocalPeer> {
    ImageSource::new(SourceConfig::in_dir(dir), LocalPeer::new(), AutoCodec::default()).unwrap()
}

/// Count live mappings of `path` in this process.
fn live_mappings(path: &Path) -> usize {
    let needle = path.to_string_lossy().into_owned();
    std::fs::read_to_string("/proc/self/maps")
        .unwrap()
        .lines()
        .filter(|line| line.contains(needle.as_str()))
        .count()
}

// ============================================================================
// Strategy Equivalence
// ============================================================================

#[test]
fn test_png_all_strategies_exact() {
    for shape in [Shape::new(17, 23, 3), Shape::new(9, 4, 1)] {
        let dir = tempdir().unwrap();
        let mut source = new_source(dir.path());
        let original = test_image(shape);

        source
            .set_image(&PngCodec.encode(&original).unwrap(), "input.png")
            .unwrap();

        for strategy in Strategy::ALL {
            let fetched = source.retrieve(strategy).unwrap();
            assert_eq!(fetched, original, "{strategy} on {shape}");
        }
    }
}

#[test]
fn test_jpeg_compressed_path_keeps_shape() {
    let dir = tempdir().unwrap();
    let mut source = new_source(dir.path());
    let jpeg = JpegCodec::new(85).encode(&test_image(Shape::new(40, 30, 3))).unwrap();

    source.set_image(&jpeg, "input.jpg").unwrap();
    let decoded = source.image().unwrap().clone();

    // Raw layouts and shared memory reproduce the decoded image exactly.
    for strategy in Strategy::ALL.into_iter().filter(Strategy::is_exact) {
        assert_eq!(source.retrieve(strategy).unwrap(), decoded, "{strategy}");
    }

    // Only the shape is guaranteed on the compressed path.
    let compressed = source.get_via_compressed().unwrap();
    assert_eq!(compressed.shape(), decoded.shape());
}

#[test]
fn test_reencoding_peer_is_lossy_but_shaped() {
    let dir = tempdir().unwrap();
    let mut source = ImageSource::new(
        SourceConfig::in_dir(dir.path()),
        LocalPeer::reencoding(JpegCodec::new(60)),
        AutoCodec::default(),
    )
    .unwrap();
    let original = test_image(Shape::new(32, 32, 3));

    source
        .set_image(&PngCodec.encode(&original).unwrap(), "input.png")
        .unwrap();

    let fetched = source.get_via_compressed().unwrap();
    assert_eq!(fetched.shape(), original.shape());
    assert!(fetched.psnr(&original).unwrap() > 20.0);
    assert_eq!(source.get_via_shared_memory().unwrap(), original);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_set_image_twice_leaves_one_mapping() {
    let dir = tempdir().unwrap();
    let mut source = new_source(dir.path());
    let backing = source.config().channel.backing_path.clone();

    let first = test_image(Shape::new(8, 8, 3));
    source.set_image(&PngCodec.encode(&first).unwrap(), "a.png").unwrap();
    assert_eq!(live_mappings(&backing), 1);

    let second = test_image(Shape::new(12, 6, 1));
    source.set_image(&PngCodec.encode(&second).unwrap(), "b.png").unwrap();
    assert_eq!(live_mappings(&backing), 1);
    assert_eq!(source.channel().generation(), 2);
    assert_eq!(source.get_via_shared_memory().unwrap(), second);

    drop(source);
    assert_eq!(live_mappings(&backing), 0);
    assert!(!backing.exists());
}

#[test]
fn test_failed_set_image_makes_nothing_available() {
    let dir = tempdir().unwrap();
    let mut source = new_source(dir.path());
    let original = test_image(Shape::new(5, 5, 3));
    source
        .set_image(&PngCodec.encode(&original).unwrap(), "good.png")
        .unwrap();

    assert!(source.set_image(b"\xFF\xD8\xFFnot really", "bad.jpg").is_err());

    for strategy in Strategy::ALL {
        assert!(matches!(source.retrieve(strategy), Err(Error::NoImage)), "{strategy}");
    }
    assert!(!source.config().channel.backing_path.exists());
}

#[test]
fn test_load_from_disk() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("photo.png");
    let original = test_image(Shape::new(10, 14, 3));
    std::fs::write(&input, PngCodec.encode(&original).unwrap()).unwrap();

    let mut source = new_source(dir.path());
    source.load(&input).unwrap();

    assert_eq!(source.source_path(), Some(input.as_path()));
    assert_eq!(source.retrieve(Strategy::Compressed).unwrap(), original);
}

#[test]
fn test_sources_in_separate_dirs_do_not_interfere() {
    let (a_dir, b_dir) = (tempdir().unwrap(), tempdir().unwrap());
    let mut a = new_source(a_dir.path());
    let mut b = new_source(b_dir.path());

    let a_image = test_image(Shape::new(6, 6, 3));
    let b_image = test_image(Shape::new(3, 9, 1));
    a.set_image(&PngCodec.encode(&a_image).unwrap(), "a.png").unwrap();
    b.set_image(&PngCodec.encode(&b_image).unwrap(), "b.png").unwrap();

    assert_eq!(a.get_via_shared_memory().unwrap(), a_image);
    assert_eq!(b.get_via_shared_memory().unwrap(), b_image);
}

// ============================================================================
// Concurrent Retrieval
// ============================================================================

#[test]
fn test_concurrent_retrieval_all_strategies() {
    let dir = tempdir().unwrap();
    let mut source = new_source(dir.path());
    let original = test_image(Shape::new(24, 16, 3));
    source
        .set_image(&PngCodec.encode(&original).unwrap(), "input.png")
        .unwrap();

    let source = Arc::new(source);
    let handles: Vec<_> = Strategy::ALL
        .into_iter()
        .map(|strategy| {
            let source = Arc::clone(&source);
            let original = original.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    assert_eq!(source.retrieve(strategy).unwrap(), original, "{strategy}");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
