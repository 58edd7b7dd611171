use clap::Parser;
use sample_annotator::cli::Cli;
use sample_annotator::error::ExitCode;
use sample_annotator::run_app_with_writer;
use sample_annotator::scanner::hash_file;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new(background_index: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let config = root.join("config.toml");
        fs::write(
            &config,
            format!(
                "uploads_folder = \"{}\"\nsample_images_folder = \"{}\"\nannotations_folder = \"{}\"\nbackground_index = {}\n",
                root.join("uploads").display(),
                root.join("sample_images").display(),
                root.join("annotations").display(),
                background_index,
            ),
        )
        .unwrap();
        for folder in ["uploads", "sample_images", "annotations"] {
            fs::create_dir_all(root.join(folder)).unwrap();
        }
        Self { dir, config }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn sample(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.root().join("sample_images").join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> (anyhow::Result<ExitCode>, String) {
        let _guard = crate::ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let config = self.config.to_string_lossy().into_owned();
        let mut argv = vec!["sample-annotator", "--config", config.as_str()];
        argv.extend_from_slice(args);

        let cli = Cli::try_parse_from(argv).unwrap();
        let mut out = Vec::new();
        let result = run_app_with_writer(cli, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let mut argv = vec!["--output", "json"];
        argv.extend_from_slice(args);
        let (result, out) = self.run(&argv);
        assert_eq!(result.unwrap(), ExitCode::Success);
        serde_json::from_str(&out).unwrap()
    }
}

#[test]
fn test_hash_prints_hash_and_url() {
    let ws = Workspace::new(false);
    let cat = ws.sample("cat.jpg", b"cat bytes");
    let expected = hash_file(&cat).unwrap();

    let value = ws.run_json(&["hash", cat.to_str().unwrap()]);
    assert_eq!(value["hash"], expected.as_str());
    assert_eq!(value["url"], format!("/api/image/{expected}"));

    let uncached = ws.run_json(&["hash", "--no-cache", cat.to_str().unwrap()]);
    assert_eq!(uncached["hash"], value["hash"]);
}

#[test]
fn test_hash_missing_file_is_not_found() {
    let ws = Workspace::new(false);
    let missing = ws.root().join("missing.jpg");

    let (result, _) = ws.run(&["hash", missing.to_str().unwrap()]);
    let err = result.unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::NotFound);

    let folder = ws.root().join("sample_images");
    let (result, _) = ws.run(&["hash", "--no-cache", folder.to_str().unwrap()]);
    assert_eq!(ExitCode::for_error(&result.unwrap_err()), ExitCode::GeneralError);
}

#[test]
fn test_file_hash_in_folder() {
    let ws = Workspace::new(false);
    let cat = ws.sample("cat.jpg", b"cat bytes");

    let value = ws.run_json(&["file-hash", "cat.jpg"]);
    assert_eq!(value["folder"], "sample_images");
    assert_eq!(value["hash"], hash_file(&cat).unwrap().as_str());

    let (result, _) = ws.run(&["file-hash", "cat.jpg", "--folder", "uploads"]);
    assert_eq!(ExitCode::for_error(&result.unwrap_err()), ExitCode::NotFound);
}

#[test]
fn test_resolve_found_and_unknown() {
    let ws = Workspace::new(true);
    let cat = ws.sample("cat.jpg", b"cat bytes");
    let hash = hash_file(&cat).unwrap();

    let (result, out) = ws.run(&["resolve", hash.as_str()]);
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert_eq!(out.trim(), cat.display().to_string());

    let unknown = "0".repeat(64);
    let (result, out) = ws.run(&["resolve", &unknown]);
    assert_eq!(result.unwrap(), ExitCode::NotFound);
    assert!(out.contains("not found"));
}

#[test]
fn test_resolve_annotated_but_missing_image() {
    let ws = Workspace::new(false);
    let hash = "9".repeat(64);
    let doc = ws.root().join("doc.json");
    fs::write(&doc, format!("{{\"imageHash\": \"{hash}\"}}")).unwrap();
    ws.run_json(&["annotation", "save", doc.to_str().unwrap()]);

    let (result, out) = ws.run(&["--output", "json", "resolve", &hash]);
    assert_eq!(result.unwrap(), ExitCode::NotFound);
    let value: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["status"], "annotation_without_image");
}

#[test]
fn test_resolve_rejects_malformed_hash() {
    let ws = Workspace::new(false);
    let (result, _) = ws.run(&["resolve", "not-a-hash"]);
    let err = result.unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(format!("{err:#}").contains("not-a-hash"));
}

#[test]
fn test_index_then_list() {
    let ws = Workspace::new(false);
    ws.sample("a.jpg", b"a");
    ws.sample("b.png", b"bb");

    let report = ws.run_json(&["index"]);
    assert_eq!(report["indexed"], 2);
    assert_eq!(ws.run_json(&["index"])["indexed"], 0);

    let listing = ws.run_json(&["list"]);
    let images = listing["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["filename"], "a.jpg");
    assert_eq!(images[1]["size"], 2);
}

#[test]
fn test_upload_respects_size_limit() {
    let ws = Workspace::new(false);
    let source = ws.root().join("incoming.png");
    fs::write(&source, vec![1u8; 64]).unwrap();

    let (result, _) = ws.run(&["upload", source.to_str().unwrap(), "--max-size", "10"]);
    assert_eq!(ExitCode::for_error(&result.unwrap_err()), ExitCode::GeneralError);

    let value = ws.run_json(&["upload", source.to_str().unwrap()]);
    assert_eq!(value["hash"], hash_file(&source).unwrap().as_str());
    assert!(ws.root().join("uploads").join("incoming.png").is_file());
}

#[test]
fn test_next_prefers_unannotated() {
    let ws = Workspace::new(false);
    let a = ws.sample("a.jpg", b"a");
    let b = ws.sample("b.jpg", b"b");

    let doc = ws.root().join("doc.json");
    let a_hash = hash_file(&a).unwrap();
    fs::write(&doc, format!("{{\"imageHash\": \"{a_hash}\"}}")).unwrap();
    ws.run_json(&["annotation", "save", doc.to_str().unwrap()]);

    let next = ws.run_json(&["next"]);
    assert_eq!(next["path"], b.to_str().unwrap());
    assert_eq!(next["priority"]["state"], "unannotated");
}

#[test]
fn test_annotation_save_show_list() {
    let ws = Workspace::new(false);
    let cat = ws.sample("cat.jpg", b"cat bytes");
    let hash = hash_file(&cat).unwrap();

    let doc = ws.root().join("doc.json");
    fs::write(
        &doc,
        format!("{{\"imageHash\": \"{hash}\", \"labels\": [\"cat\"]}}"),
    )
    .unwrap();
    let saved = ws.run_json(&["annotation", "save", doc.to_str().unwrap()]);
    assert!(saved["path"]
        .as_str()
        .unwrap()
        .ends_with(&format!("annotation_{hash}.json")));

    let shown = ws.run_json(&["annotation", "show", hash.as_str()]);
    assert_eq!(shown["reviewCount"], 1);
    assert_eq!(shown["labels"], serde_json::json!(["cat"]));
    assert!(shown["lastReviewed"].is_string());

    let shown = ws.run_json(&["annotation", "show", hash.as_str()]);
    assert_eq!(shown["reviewCount"], 2);

    let listing = ws.run_json(&["annotation", "list"]);
    assert_eq!(listing["annotations"].as_array().unwrap().len(), 1);
}

#[test]
fn test_annotation_show_missing_is_not_found() {
    let ws = Workspace::new(false);
    let (result, _) = ws.run(&["annotation", "show", &"3".repeat(64)]);
    assert_eq!(ExitCode::for_error(&result.unwrap_err()), ExitCode::NotFound);
}

#[test]
fn test_annotation_save_rejects_non_object() {
    let ws = Workspace::new(false);
    let doc = ws.root().join("doc.json");
    fs::write(&doc, "[1, 2]").unwrap();

    let (result, _) = ws.run(&["annotation", "save", doc.to_str().unwrap()]);
    assert!(result.is_err());
}

#[test]
fn test_broken_config_file_is_an_error() {
    let ws = Workspace::new(false);
    fs::write(&ws.config, "background_index = \"maybe\"\n").unwrap();

    let (result, _) = ws.run(&["index"]);
    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to load config"));
}
