//! Lifecycle and configuration management for a single CouchPotato instance.
//!
//! The deployment tool's hooks drive this crate through [`ServiceManager`]:
//! editing the service's INI settings file, controlling its systemd unit,
//! wiring up SABnzbd/Plex companions, and taking scheduled backups of its
//! state. Deployment configuration and the scheduled-task store are injected
//! at construction.

pub mod backup;
pub mod config;
pub mod cron;
pub mod manager;
pub mod services;
pub mod settings;
pub mod types;

pub use config::DeployConfig;
pub use cron::{CronEntry, CronStore, SystemCrontab};
pub use manager::ServiceManager;
pub use settings::SettingsFile;
pub use types::{BackupInfo, ServicePaths};
