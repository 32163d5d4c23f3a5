//! Config file loading from disk.

use take2_core::backoff::BackoffStrategy;
use take2_core::config::{load_from_path, load_or_init_at, Take2Config};
use take2_core::retry::FailureKind;
use tempfile::tempdir;

#[test]
fn missing_file_is_created_with_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let cfg = load_or_init_at(&path).unwrap();
    assert_eq!(cfg, Take2Config::default());
    assert!(path.exists());

    let reloaded = load_from_path(&path).unwrap();
    assert_eq!(reloaded, cfg);
}

#[test]
fn existing_file_is_read_and_validated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[policy]
retries = 4
retriable = ["timeout", "exit:75"]
backoff_setup = { type = "linear", start = 0.5 }
"#,
    )
    .unwrap();

    let cfg = load_or_init_at(&path).unwrap();
    assert_eq!(
        cfg.policy.backoff_setup.map(|b| b.strategy()),
        Some(BackoffStrategy::Linear)
    );
    let policy = cfg.policy.to_policy().unwrap();
    assert_eq!(policy.retries(), 4);
    assert!(policy.is_retriable(&FailureKind::Timeout));
    assert!(policy.is_retriable(&FailureKind::custom("exit:75")));
    assert_eq!(
        policy.backoff_intervals().unwrap().as_slice()[..3],
        [0.5, 1.0, 1.5]
    );
}

#[test]
fn malformed_file_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[policy]\nretries = \"many\"\n").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(format!("{err:#}").contains("config.toml"));
}
