use sample_annotator::cache::{HashIndex, KvCache, PATH_CACHE_FILE};
use sample_annotator::indexer::{BackgroundIndexer, IndexReport};
use sample_annotator::progress::ProgressCallback;
use sample_annotator::scanner::{hash_file, ContentHasher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn setup() -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();
    let samples = dir.path().join("sample_images");
    let uploads = dir.path().join("uploads");
    fs::create_dir(&samples).unwrap();
    fs::create_dir(&uploads).unwrap();
    (dir, samples, uploads)
}

fn indexer(root: &Path, folders: Vec<PathBuf>) -> (BackgroundIndexer, Arc<KvCache>) {
    let index = HashIndex::open(root);
    let indexer = BackgroundIndexer::new(
        ContentHasher::new(index.computed.clone()),
        index.paths.clone(),
        folders,
    );
    (indexer, index.paths)
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ProgressCallback for Recorder {
    fn on_phase_start(&self, phase: &str, total: usize) {
        let name = Path::new(phase).file_name().unwrap().to_string_lossy().into_owned();
        self.events.lock().unwrap().push(format!("start {name} {total}"));
    }

    fn on_progress(&self, current: usize, _path: &str) {
        self.events.lock().unwrap().push(format!("file {current}"));
    }

    fn on_phase_end(&self, phase: &str) {
        let name = Path::new(phase).file_name().unwrap().to_string_lossy().into_owned();
        self.events.lock().unwrap().push(format!("end {name}"));
    }
}

#[test]
fn test_background_sweep_indexes_all_folders() {
    let (dir, samples, uploads) = setup();
    fs::write(samples.join("a.jpg"), b"a").unwrap();
    fs::write(samples.join("b.png"), b"b").unwrap();
    fs::write(uploads.join("c.webp"), b"c").unwrap();
    fs::write(uploads.join("readme.md"), b"not an image").unwrap();

    let (indexer, paths) = indexer(dir.path(), vec![samples.clone(), uploads.clone()]);
    let report = indexer.spawn().unwrap().join().unwrap();

    assert_eq!(report.indexed, 3);
    assert_eq!(paths.len(), 3);
    let c_hash = hash_file(&uploads.join("c.webp")).unwrap();
    assert_eq!(
        paths.get(c_hash.as_str()).map(PathBuf::from),
        Some(uploads.join("c.webp"))
    );

    let persisted = KvCache::load(&dir.path().join(PATH_CACHE_FILE));
    assert_eq!(persisted.snapshot(), paths.snapshot());
}

#[test]
fn test_second_sweep_finds_nothing_new() {
    let (dir, samples, uploads) = setup();
    fs::write(samples.join("a.jpg"), b"a").unwrap();

    let (indexer, _) = indexer(dir.path(), vec![samples, uploads]);
    assert_eq!(indexer.run().indexed, 1);

    let report = indexer.run();
    assert_eq!(
        report,
        IndexReport {
            already_known: 1,
            ..IndexReport::default()
        }
    );
}

#[test]
fn test_empty_sweep_writes_no_file() {
    let (dir, samples, uploads) = setup();

    let (indexer, _) = indexer(dir.path(), vec![samples, uploads]);
    assert_eq!(indexer.run(), IndexReport::default());
    assert!(!dir.path().join(PATH_CACHE_FILE).exists());
}

#[test]
fn test_progress_callback_sees_every_file() {
    let (dir, samples, uploads) = setup();
    fs::write(samples.join("a.jpg"), b"a").unwrap();
    fs::write(samples.join("b.jpg"), b"b").unwrap();

    let recorder = Arc::new(Recorder::default());
    let (indexer, _) = indexer(dir.path(), vec![samples, uploads]);
    indexer.with_progress_callback(recorder.clone()).run();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start sample_images 2",
            "file 1",
            "file 2",
            "end sample_images",
            "start uploads 0",
            "end uploads",
        ]
    );
}
