use figment::providers::{Env, Serialized};
use figment::Figment;
use sample_annotator::config::{Config, ConfigOverrides, ENV_PREFIX};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    crate::ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[test]
fn test_config_load_defaults() {
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_load_from_env() {
    let _guard = env_lock();
    std::env::set_var("SAMPLE_ANNOTATOR_MAX_UPLOAD_SIZE", "1024");
    std::env::set_var("SAMPLE_ANNOTATOR_BACKGROUND_INDEX", "false");

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed(ENV_PREFIX));
    let config: Config = figment.extract().unwrap();

    std::env::remove_var("SAMPLE_ANNOTATOR_MAX_UPLOAD_SIZE");
    std::env::remove_var("SAMPLE_ANNOTATOR_BACKGROUND_INDEX");

    assert_eq!(config.max_upload_size, 1024);
    assert!(!config.background_index);
}

#[test]
fn test_config_load_from_toml() {
    let _guard = env_lock();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
uploads_folder = "/srv/uploads"
sample_images_folder = "/srv/samples"
annotations_folder = "/srv/data/annotations"
max_upload_size = 2048
background_index = false
"#,
    )
    .unwrap();

    let config = Config::try_load(Some(config_path.as_path()), &ConfigOverrides::default()).unwrap();

    assert_eq!(config.uploads_folder, PathBuf::from("/srv/uploads"));
    assert_eq!(config.sample_images_folder, PathBuf::from("/srv/samples"));
    assert_eq!(config.max_upload_size, 2048);
    assert!(!config.background_index);
    assert_eq!(config.cache_dir(), PathBuf::from("/srv/data"));
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let _guard = env_lock();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "max_upload_size = 10\n").unwrap();

    let config = Config::load_from_path(&config_path);
    assert_eq!(config.max_upload_size, 10);
    assert_eq!(config.uploads_folder, PathBuf::from("uploads"));
    assert!(config.background_index);
}

#[test]
fn test_env_overrides_file_and_cli_overrides_env() {
    let _guard = env_lock();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        "uploads_folder = \"from_file\"\nannotations_folder = \"from_file\"\n",
    )
    .unwrap();

    std::env::set_var("SAMPLE_ANNOTATOR_UPLOADS_FOLDER", "from_env");
    std::env::set_var("SAMPLE_ANNOTATOR_ANNOTATIONS_FOLDER", "from_env");
    let overrides = ConfigOverrides {
        annotations_folder: Some(PathBuf::from("from_cli")),
        ..ConfigOverrides::default()
    };
    let config = Config::try_load(Some(config_path.as_path()), &overrides);
    std::env::remove_var("SAMPLE_ANNOTATOR_UPLOADS_FOLDER");
    std::env::remove_var("SAMPLE_ANNOTATOR_ANNOTATIONS_FOLDER");

    let config = config.unwrap();
    assert_eq!(config.uploads_folder, PathBuf::from("from_env"));
    assert_eq!(config.annotations_folder, PathBuf::from("from_cli"));
}

#[test]
fn test_invalid_toml_strict_and_tolerant() {
    let _guard = env_lock();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "max_upload_size = \"lots\"\n").unwrap();

    assert!(Config::try_load(Some(config_path.as_path()), &ConfigOverrides::default()).is_err());

    let overrides = ConfigOverrides {
        uploads_folder: Some(PathBuf::from("kept")),
        ..ConfigOverrides::default()
    };
    let config = Config::load(Some(config_path.as_path()), &overrides);
    assert_eq!(config.max_upload_size, Config::default().max_upload_size);
    assert_eq!(config.uploads_folder, PathBuf::from("kept"));
}

#[test]
fn test_missing_config_file_is_not_an_error() {
    let _guard = env_lock();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("absent.toml");

    let config = Config::try_load(Some(config_path.as_path()), &ConfigOverrides::default()).unwrap();
    assert_eq!(config, Config::default());
}
