use std::path::PathBuf;

use chromatic_harmony::config::AppConfig;

#[test]
fn test_default_config() {
    let config = AppConfig::default();
    assert!(config.store.path.is_none());
    assert!(config.logging.file.is_none());
    assert_eq!(config.document.content_selector, ".content-wrapper");
}

#[test]
fn test_parse_toml() {
    let toml_str = r##"
[store]
path = "/tmp/prefs.json"

[document]
content_selector = "#main"

[logging]
level = "warn"
"##;

    let config: AppConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.store.path, Some(PathBuf::from("/tmp/prefs.json")));
    assert_eq!(config.document.content_selector, "#main");
    assert_eq!(config.document.title, "Chromatic Harmony");
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[document]\ntitle = \"Preview\"\n").unwrap();

    let config = AppConfig::load_layered(Some(&path), &[]).unwrap();
    assert_eq!(config.document.title, "Preview");
    assert_eq!(config.document.content_selector, ".content-wrapper");
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_explicit_store_path_wins() {
    let config = AppConfig::load_layered(None, &[("store.path", "here.json".to_string())]).unwrap();
    assert_eq!(config.store_path(), PathBuf::from("here.json"));
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[logging\nlevel = ").unwrap();

    assert!(AppConfig::load(&path).is_err());
}
