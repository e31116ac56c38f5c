//! Shared fixtures for the integration tests.
//!
//! Tests run against temporary directories and an in-memory crontab so they
//! never need a real CouchPotato installation, systemctl, or root access.

#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use couchctl::cron::{CronEntry, CronStore};
use couchctl::{DeployConfig, ServicePaths};

/// Deployment configuration pointing backups at `backup_location`.
pub fn test_config(backup_location: &Path, backup_count: i64, port: u16) -> DeployConfig {
    DeployConfig {
        couch_user: "couch".to_string(),
        port,
        backup_location: backup_location.to_path_buf(),
        backup_count,
        backup_cron: "0 3 * * *".to_string(),
        source: None,
    }
}

/// A populated service tree under a temp dir: database files plus a settings
/// document.
pub fn create_service_tree() -> (TempDir, ServicePaths) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let paths = ServicePaths::rooted(temp_dir.path().to_path_buf());

    fs::create_dir_all(&paths.database_dir).expect("Failed to create database dir");
    fs::write(paths.database_dir.join("couchpotato.db"), b"mock database").unwrap();
    fs::write(paths.database_dir.join("couchpotato.db-wal"), b"mock wal").unwrap();
    fs::write(
        &paths.settings_file,
        "[core]\nport = 5050\nhost = 0.0.0.0\n",
    )
    .unwrap();

    (temp_dir, paths)
}

/// In-memory crontab standing in for the system store. Clones share state so
/// a test can inspect rows after handing the store to the manager.
#[derive(Clone, Default)]
pub struct FakeCronStore {
    rows: Arc<Mutex<Vec<CronEntry>>>,
}

impl FakeCronStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tagged(&self, tag: &str) -> Vec<CronEntry> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.tag == tag)
            .cloned()
            .collect()
    }
}

impl CronStore for FakeCronStore {
    async fn entries(&self) -> Result<Vec<CronEntry>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn install(&self, entry: &CronEntry) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|e| e.tag != entry.tag);
        rows.push(entry.clone());
        Ok(())
    }

    async fn remove(&self, tag: &str) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|e| e.tag != tag);
        Ok(rows.len() != before)
    }
}
