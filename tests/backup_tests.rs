//! Integration tests for backup archiving and retention pruning.
//!
//! The retention invariant: with N files present and a retention count R > 0,
//! a backup run leaves the newest R files in place (the fresh archive
//! included) and removes the rest, oldest first. R <= 0 disables pruning.

mod common;

use common::{create_service_tree, test_config, FakeCronStore};
use couchctl::{backup, ServiceManager};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tar::Archive;
use tempfile::TempDir;

/// Pre-seed `dir` with archive files whose mtimes step one hour apart,
/// oldest first.
fn seed_backups(dir: &Path, names: &[&str]) {
    let now = SystemTime::now();
    for (i, name) in names.iter().enumerate() {
        let path = dir.join(name);
        fs::write(&path, b"old archive").unwrap();
        let age = Duration::from_secs(3600 * (names.len() - i) as u64);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(now - age)
            .unwrap();
    }
}

fn backup_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn archive_name_is_timestamped_without_colons() {
    use chrono::TimeZone;

    let ts = chrono::Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    let name = backup::archive_name(ts);
    assert_eq!(name, "couchback-2025-01-02T03-04-05.tgz");
    assert!(!name.contains(':'));
}

#[tokio::test]
async fn backup_creates_archive_with_database_and_settings() {
    let (_tree, paths) = create_service_tree();
    let backup_dir = TempDir::new().unwrap();
    let config = test_config(backup_dir.path(), 7, 5050);

    let manager = ServiceManager::with_paths(config, paths, FakeCronStore::new()).unwrap();
    let info = manager.backup().await.unwrap();

    assert!(info.path.exists());
    assert!(info.filename.starts_with("couchback-"));
    assert!(info.filename.ends_with(".tgz"));
    assert!(!info.filename.contains(':'));
    assert!(info.size_bytes > 0);

    let mut archive = Archive::new(GzDecoder::new(File::open(&info.path).unwrap()));
    let entries: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
        .collect();

    assert!(entries.contains(&"settings.conf".to_string()));
    assert!(entries.contains(&"database/couchpotato.db".to_string()));
    assert!(entries
        .iter()
        .all(|p| p == "settings.conf" || p == "database" || p.starts_with("database/")));
}

#[tokio::test]
async fn backup_creates_missing_backup_directory() {
    let (_tree, paths) = create_service_tree();
    let parent = TempDir::new().unwrap();
    let backup_dir = parent.path().join("backups");
    let config = test_config(&backup_dir, 7, 5050);

    let manager = ServiceManager::with_paths(config, paths, FakeCronStore::new()).unwrap();
    manager.backup().await.unwrap();

    assert!(backup_dir.is_dir());
    assert_eq!(backup_files(&backup_dir).len(), 1);
}

#[tokio::test]
async fn backup_prunes_oldest_past_retention() {
    let (_tree, paths) = create_service_tree();
    let backup_dir = TempDir::new().unwrap();
    seed_backups(backup_dir.path(), &["old-1.tgz", "old-2.tgz", "old-3.tgz", "old-4.tgz"]);

    let config = test_config(backup_dir.path(), 3, 5050);
    let manager = ServiceManager::with_paths(config, paths, FakeCronStore::new()).unwrap();
    let info = manager.backup().await.unwrap();

    // 4 existing + 1 new, retention 3: the two oldest go.
    let remaining = backup_files(backup_dir.path());
    assert_eq!(remaining.len(), 3);
    assert!(!remaining.contains(&"old-1.tgz".to_string()));
    assert!(!remaining.contains(&"old-2.tgz".to_string()));
    assert!(remaining.contains(&"old-3.tgz".to_string()));
    assert!(remaining.contains(&"old-4.tgz".to_string()));
    assert!(remaining.contains(&info.filename));
}

#[tokio::test]
async fn backup_with_zero_retention_prunes_nothing() {
    let (_tree, paths) = create_service_tree();
    let backup_dir = TempDir::new().unwrap();
    seed_backups(backup_dir.path(), &["old-1.tgz", "old-2.tgz", "old-3.tgz"]);

    let config = test_config(backup_dir.path(), 0, 5050);
    let manager = ServiceManager::with_paths(config, paths, FakeCronStore::new()).unwrap();
    manager.backup().await.unwrap();

    assert_eq!(backup_files(backup_dir.path()).len(), 4);
}

#[tokio::test]
async fn backup_with_negative_retention_prunes_nothing() {
    let (_tree, paths) = create_service_tree();
    let backup_dir = TempDir::new().unwrap();
    seed_backups(backup_dir.path(), &["old-1.tgz", "old-2.tgz"]);

    let config = test_config(backup_dir.path(), -1, 5050);
    let manager = ServiceManager::with_paths(config, paths, FakeCronStore::new()).unwrap();
    manager.backup().await.unwrap();

    assert_eq!(backup_files(backup_dir.path()).len(), 3);
}

#[test]
fn prune_removes_exactly_the_oldest() {
    let dir = TempDir::new().unwrap();
    seed_backups(dir.path(), &["a.tgz", "b.tgz", "c.tgz", "d.tgz", "e.tgz"]);

    let removed = backup::prune(dir.path(), 2).unwrap();

    assert_eq!(removed.len(), 3);
    let remaining = backup_files(dir.path());
    assert_eq!(remaining, vec!["d.tgz".to_string(), "e.tgz".to_string()]);
}

#[test]
fn prune_under_retention_is_a_noop() {
    let dir = TempDir::new().unwrap();
    seed_backups(dir.path(), &["a.tgz", "b.tgz"]);

    let removed = backup::prune(dir.path(), 5).unwrap();

    assert!(removed.is_empty());
    assert_eq!(backup_files(dir.path()).len(), 2);
}
