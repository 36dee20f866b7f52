//! Unit tests for configuration loading

use completion_gateway::config::{PromptTemplates, Settings};
use completion_gateway::AppError;
use std::fs;
use tempfile::TempDir;

fn write_config(contents: &str) -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gateway.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn test_missing_file_uses_defaults() {
    let settings = Settings::load_from_path("does/not/exist.toml").unwrap();
    assert_eq!(settings.backend.candidates, vec!["jamba-1.5-large", "jamba-1.5-mini"]);
    assert_eq!(settings.cache.ttl_secs, 1800);
    assert_eq!(settings.cache.max_size, 500);
    assert_eq!(settings.selection.max_failures, 3);
}

#[test]
fn test_load_from_toml() {
    let (_dir, path) = write_config(
        r#"
[backend]
base_url = "http://localhost:9000/v1"
api_key = "file-key"
candidates = ["small-model"]
native_json_mode = true

[cache]
ttl_secs = 60
max_size = 25

[selection]
max_failures = 5

[prompts]
translate = "Render {text} in {language}"
"#,
    );

    let settings = Settings::load_from_path(&path).unwrap();
    assert_eq!(settings.backend.base_url, "http://localhost:9000/v1");
    assert_eq!(settings.backend.candidates, vec!["small-model"]);
    assert!(settings.backend.native_json_mode);
    assert_eq!(settings.cache.ttl_secs, 60);
    assert_eq!(settings.cache.max_size, 25);
    assert_eq!(settings.selection.max_failures, 5);
    assert_eq!(settings.api_key().unwrap(), "file-key");
    assert_eq!(settings.prompts.translate, "Render {text} in {language}");
    // Unset templates keep their defaults.
    assert_eq!(settings.prompts.quiz, PromptTemplates::default().quiz);
}

#[test]
fn test_environment_overrides_file() {
    let (_dir, path) = write_config("[rate_limit]\nmin_gap_ms = 250\n");

    std::env::set_var("COMPLETION_GATEWAY__RATE_LIMIT__MIN_GAP_MS", "750");
    let settings = Settings::load_from_path(&path);
    std::env::remove_var("COMPLETION_GATEWAY__RATE_LIMIT__MIN_GAP_MS");

    assert_eq!(settings.unwrap().rate_limit.min_gap_ms, 750);
}

#[test]
fn test_empty_candidates_rejected() {
    let (_dir, path) = write_config("[backend]\ncandidates = []\n");
    let result = Settings::load_from_path(&path);
    assert!(matches!(result, Err(AppError::InvalidConfig(_))));
}

#[test]
fn test_zero_cache_size_rejected() {
    let mut settings = Settings::default();
    settings.cache.max_size = 0;
    assert!(matches!(settings.validate(), Err(AppError::InvalidConfig(_))));
}

#[test]
fn test_negative_backoff_rejected() {
    let mut settings = Settings::default();
    settings.rate_limit.backoff_factor = -1.0;
    assert!(settings.validate().is_err());
}

#[test]
fn test_oversized_min_gap_rejected() {
    let mut settings = Settings::default();
    settings.rate_limit.min_gap_ms = 3_600_000;
    assert!(settings.validate().is_ok());

    settings.rate_limit.min_gap_ms = u64::MAX;
    assert!(matches!(settings.validate(), Err(AppError::InvalidConfig(_))));
}
