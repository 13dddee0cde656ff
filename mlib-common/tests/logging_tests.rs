//! File logging through the background writer
//!
//! Installs the global subscriber, so this file holds a single test.

use mlib_common::config::LoggingConfig;
use mlib_common::logging::init_tracing;

#[test]
fn test_file_log_flushed_when_guard_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("player.log");
    let config = LoggingConfig {
        level: "info".to_string(),
        file: Some(path.clone()),
    };

    let guard = init_tracing(&config, "").unwrap();
    assert!(guard.is_some());

    tracing::info!("session 7 started");
    drop(guard);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("session 7 started"), "{}", contents);
    assert!(!contents.contains("\u{1b}["), "file output has no ANSI colours");

    assert!(init_tracing(&config, "").is_err());
}
