use filetime::{set_file_mtime, FileTime};
use sample_annotator::cache::{HashIndex, KvCache, HASH_CACHE_FILE, PATH_CACHE_FILE};
use sample_annotator::scanner::{cache_key, hash_file, ContentHasher};
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn test_cache_survives_restart() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("cat.jpg");
    fs::write(&image, b"cat pixels").unwrap();

    let first = {
        let index = HashIndex::open(dir.path());
        let hasher = ContentHasher::new(index.computed.clone());
        hasher.compute(&image, true).unwrap()
    };
    assert!(dir.path().join(HASH_CACHE_FILE).is_file());

    let index = HashIndex::open(dir.path());
    let key = cache_key(&image, &fs::metadata(&image).unwrap());
    assert_eq!(index.computed.get(&key).as_deref(), Some(first.as_str()));
}

#[test]
fn test_snapshot_round_trip_reproduces_map() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(PATH_CACHE_FILE);

    let cache = KvCache::load(&path);
    cache.put("a".repeat(64), "sample_images/a.jpg");
    cache.put("b".repeat(64), "uploads/b.png");
    cache.put("c".repeat(64), "sample_images/caf\u{e9}.jpg");
    cache.save().unwrap();

    let reloaded = KvCache::load(&path);
    assert_eq!(reloaded.snapshot(), cache.snapshot());
}

#[test]
fn test_deleted_cache_files_start_empty() {
    let dir = tempdir().unwrap();
    {
        let index = HashIndex::open(dir.path());
        index.computed.put_and_save("k", "v").unwrap();
        index.paths.put_and_save("h", "p").unwrap();
    }

    fs::remove_file(dir.path().join(HASH_CACHE_FILE)).unwrap();
    fs::remove_file(dir.path().join(PATH_CACHE_FILE)).unwrap();

    let index = HashIndex::open(dir.path());
    assert!(index.computed.is_empty());
    assert!(index.paths.is_empty());
}

#[test]
fn test_corrupt_cache_file_starts_empty() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(HASH_CACHE_FILE), "{ not json").unwrap();
    fs::write(dir.path().join(PATH_CACHE_FILE), "[1, 2, 3]").unwrap();

    let index = HashIndex::open(dir.path());
    assert!(index.computed.is_empty());
    assert!(index.paths.is_empty());

    index.paths.put_and_save("h", "p").unwrap();
    let reloaded = HashIndex::open(dir.path());
    assert_eq!(reloaded.paths.get("h").as_deref(), Some("p"));
}

#[test]
fn test_cached_and_uncached_hashes_agree() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("photo.png");
    fs::write(&image, vec![7u8; 200_000]).unwrap();

    let hasher = ContentHasher::new(Arc::new(KvCache::load(&dir.path().join(HASH_CACHE_FILE))));
    let uncached = hasher.compute(&image, false).unwrap();
    let cached_miss = hasher.compute(&image, true).unwrap();
    let cached_hit = hasher.compute(&image, true).unwrap();

    assert_eq!(uncached, hash_file(&image).unwrap());
    assert_eq!(cached_miss, uncached);
    assert_eq!(cached_hit, uncached);
}

#[test]
fn test_uncached_compute_leaves_cache_untouched() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("photo.png");
    fs::write(&image, b"bytes").unwrap();

    let hasher = ContentHasher::new(Arc::new(KvCache::load(&dir.path().join(HASH_CACHE_FILE))));
    hasher.compute(&image, false).unwrap();

    assert!(hasher.cache().is_empty());
    assert!(!dir.path().join(HASH_CACHE_FILE).exists());
}

#[test]
fn test_same_mtime_and_size_returns_stale_hash() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("cat.jpg");
    let pinned = FileTime::from_unix_time(1_700_000_000, 0);

    fs::write(&image, b"AAAA").unwrap();
    set_file_mtime(&image, pinned).unwrap();

    let hasher = ContentHasher::new(Arc::new(KvCache::load(&dir.path().join(HASH_CACHE_FILE))));
    let original = hasher.compute(&image, true).unwrap();

    fs::write(&image, b"BBBB").unwrap();
    set_file_mtime(&image, pinned).unwrap();

    // The key only sees name, mtime and size, so the old hash comes back.
    assert_eq!(hasher.compute(&image, true).unwrap(), original);
    assert_ne!(hash_file(&image).unwrap(), original);
}

#[test]
fn test_mtime_change_invalidates_cache_entry() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("cat.jpg");

    fs::write(&image, b"AAAA").unwrap();
    set_file_mtime(&image, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();

    let hasher = ContentHasher::new(Arc::new(KvCache::load(&dir.path().join(HASH_CACHE_FILE))));
    let original = hasher.compute(&image, true).unwrap();

    fs::write(&image, b"BBBB").unwrap();
    set_file_mtime(&image, FileTime::from_unix_time(1_700_000_100, 0)).unwrap();

    let updated = hasher.compute(&image, true).unwrap();
    assert_ne!(updated, original);
    assert_eq!(updated, hash_file(&image).unwrap());
    assert_eq!(hasher.cache().len(), 2);
}
