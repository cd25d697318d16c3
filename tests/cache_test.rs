// Layer cache tests: key derivation and on-disk store.

use image::{Rgba, RgbaImage};
use pdf_layering::cache::hash::{compute_cache_key, source_digest};
use pdf_layering::cache::store::CacheStore;
use pdf_layering::config::job::Variant;
use pdf_layering::geometry::Rect;
use pdf_layering::geometry::projection::CanvasSize;
use pdf_layering::layers::CropMode;
use pdf_layering::pipeline::page_processor::{LayerConfig, compose_page};

fn rects() -> Vec<Rect> {
    vec![Rect::new(4, 4, 20, 16).unwrap()]
}

fn sample_page(mode: CropMode) -> pdf_layering::layers::PreparedPage {
    let img = RgbaImage::from_fn(40, 30, |x, y| Rgba([x as u8 * 5, y as u8 * 7, 90, 255]));
    let config = LayerConfig {
        crop_mode: mode,
        ..LayerConfig::default()
    };
    compose_page(&img, &rects(), &config, Variant::Masked).expect("compose")
}

// ============================================================
// 1. Keys
// ============================================================

#[test]
fn test_cache_key_is_lowercase_hex_sha256() {
    let digest = source_digest(b"png bytes");
    let key = compute_cache_key(&digest, &rects(), &LayerConfig::default(), Variant::Masked);
    assert_eq!(key.len(), 64);
    assert!(key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
}

#[test]
fn test_cache_key_is_deterministic() {
    let config = LayerConfig::default();
    assert_eq!(
        compute_cache_key(&source_digest(b"abc"), &rects(), &config, Variant::Masked),
        compute_cache_key(&source_digest(b"abc"), &rects(), &config, Variant::Masked)
    );
}

#[test]
fn test_cache_key_changes_with_inputs() {
    let config = LayerConfig::default();
    let abc = source_digest(b"abc");
    let base = compute_cache_key(&abc, &rects(), &config, Variant::Masked);

    let abd = source_digest(b"abd");
    assert_ne!(base, compute_cache_key(&abd, &rects(), &config, Variant::Masked));
    assert_ne!(base, compute_cache_key(&abc, &[], &config, Variant::Masked));
    assert_ne!(base, compute_cache_key(&abc, &rects(), &config, Variant::BackgroundOnly));

    let wider = LayerConfig {
        foreground_margin: 6,
        ..config
    };
    assert_ne!(base, compute_cache_key(&abc, &rects(), &wider, Variant::Masked));
}

#[test]
fn test_cache_key_ignores_canvas() {
    let letter = LayerConfig::default();
    let a4 = LayerConfig {
        canvas: CanvasSize::A4,
        ..letter
    };
    let abc = source_digest(b"abc");
    assert_eq!(
        compute_cache_key(&abc, &rects(), &letter, Variant::Masked),
        compute_cache_key(&abc, &rects(), &a4, Variant::Masked)
    );
}

// ============================================================
// 2. Store
// ============================================================

#[test]
fn test_store_and_retrieve_round_trip() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = CacheStore::new(dir.path());
    for (key, mode) in [
        ("0".repeat(64), CropMode::Cropped),
        ("1".repeat(64), CropMode::Masked),
    ] {
        let page = sample_page(mode);
        store.store(&key, &page).expect("store");
        assert!(store.contains(&key));

        let cached = store
            .retrieve(&key, (40, 30))
            .expect("retrieve")
            .expect("cache hit");
        assert_eq!(cached, page);
    }
}

#[test]
fn test_retrieve_miss_and_dimension_mismatch() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = CacheStore::new(dir.path().join("nested/cache"));
    let key = "ab".repeat(32);

    assert!(!store.contains(&key));
    assert!(store.retrieve(&key, (40, 30)).unwrap().is_none());

    store.store(&key, &sample_page(CropMode::Cropped)).unwrap();
    assert!(store.retrieve(&key, (41, 30)).unwrap().is_none());
    assert!(store.retrieve(&key, (40, 30)).unwrap().is_some());
}

#[test]
fn test_invalid_key_is_rejected() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = CacheStore::new(dir.path());
    let page = sample_page(CropMode::Cropped);

    assert!(store.store("../escape", &page).is_err());
    assert!(store.retrieve("../escape", (40, 30)).is_err());
    assert!(!store.contains("../escape"));
}

#[test]
fn test_contains_false_when_layer_file_missing() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = CacheStore::new(dir.path());
    let key = "c".repeat(64);
    store.store(&key, &sample_page(CropMode::Cropped)).unwrap();

    std::fs::remove_file(dir.path().join(&key).join("layer-001.bin")).unwrap();
    assert!(!store.contains(&key));
}

#[test]
fn test_store_same_key_keeps_existing_entry() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = CacheStore::new(dir.path());
    let key = "d".repeat(64);
    let first = sample_page(CropMode::Cropped);

    store.store(&key, &first).unwrap();
    store.store(&key, &sample_page(CropMode::Masked)).unwrap();
    assert_eq!(store.retrieve(&key, (40, 30)).unwrap(), Some(first));
}

#[test]
fn test_store_replaces_incomplete_entry() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = CacheStore::new(dir.path());
    let key = "e".repeat(64);
    std::fs::create_dir_all(dir.path().join(&key)).unwrap();
    std::fs::write(dir.path().join(&key).join("layer-000.bin"), b"partial").unwrap();
    assert!(!store.contains(&key));

    let page = sample_page(CropMode::Cropped);
    store.store(&key, &page).unwrap();
    assert_eq!(store.retrieve(&key, (40, 30)).unwrap(), Some(page));
}

/// Several writers racing on one key all succeed and leave one entry.
#[test]
fn test_concurrent_store_same_key() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = CacheStore::new(dir.path());
    let key = "f".repeat(64);
    let page = sample_page(CropMode::Cropped);

    for _ in 0..20 {
        let _ = std::fs::remove_dir_all(dir.path().join(&key));
        let (store, key, page) = (&store, key.as_str(), &page);
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(move || store.store(key, page)))
                .collect();
            for h in handles {
                h.join().expect("writer thread").expect("store");
            }
        });
        assert_eq!(store.retrieve(key, (40, 30)).unwrap(), Some(page.clone()));
    }

    let entries: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec![key]);
}
