//! All lifecycle, configuration, integration, and backup operations for one
//! CouchPotato instance.

use anyhow::{Context, Result};
use chrono::Local;
use std::env;
use tracing::{debug, info, warn};

use crate::backup;
use crate::config::DeployConfig;
use crate::cron::{CronEntry, CronStore};
use crate::services::{commands, systemctl};
use crate::settings::SettingsFile;
use crate::types::{BackupInfo, ServicePaths};

/// The systemd unit under management.
pub const SERVICE_NAME: &str = "couchpotato.service";

/// Marker comment identifying the managed backup row in the crontab.
pub const BACKUP_CRON_TAG: &str = "couchpotato backup";

/// Manager for a single CouchPotato instance.
///
/// Deployment configuration, the service's filesystem layout, and the
/// scheduled-task store are injected at construction. Every settings mutator
/// is write-through: it updates the in-memory document and persists it before
/// returning. [`reload_config`](Self::reload_config) and
/// [`save_config`](Self::save_config) give callers explicit control over the
/// in-memory/on-disk boundary when they need it.
pub struct ServiceManager<C: CronStore> {
    config: DeployConfig,
    paths: ServicePaths,
    settings: SettingsFile,
    cron: C,
}

impl<C: CronStore> ServiceManager<C> {
    /// Build a manager for the configured service user, parsing the settings
    /// document from disk. A missing settings file yields an empty document.
    pub fn new(config: DeployConfig, cron: C) -> Result<Self> {
        let paths = ServicePaths::for_user(&config.couch_user);
        Self::with_paths(config, paths, cron)
    }

    /// Build a manager against an explicit filesystem layout.
    pub fn with_paths(config: DeployConfig, paths: ServicePaths, cron: C) -> Result<Self> {
        let settings = SettingsFile::open(paths.settings_file.clone())?;
        Ok(Self {
            config,
            paths,
            settings,
            cron,
        })
    }

    pub fn paths(&self) -> &ServicePaths {
        &self.paths
    }

    pub fn settings(&self) -> &SettingsFile {
        &self.settings
    }

    /// Re-read the settings document from disk.
    pub fn reload_config(&mut self) -> Result<()> {
        self.settings.reload()
    }

    /// Persist the settings document. Whole-file overwrite, not atomic.
    pub fn save_config(&self) -> Result<()> {
        self.settings.save()
    }

    /// Set the hostname the service binds to.
    pub fn set_host(&mut self, hostname: &str) -> Result<()> {
        self.settings.set("core", "host", hostname);
        self.settings.save()?;
        info!("Couchpotato hostname set to {}", hostname);
        Ok(())
    }

    /// Align the service port with the deployment configuration.
    pub fn set_port(&mut self) -> Result<()> {
        self.settings
            .set("core", "port", &self.config.port.to_string());
        self.settings.save()?;
        info!("Couchpotato port set to {}", self.config.port);
        Ok(())
    }

    /// Toggle the newznab indexers.
    pub fn set_indexers(&mut self, enabled: bool) -> Result<()> {
        let value = if enabled { "1" } else { "0" };
        self.settings.set("newznab", "enabled", value);
        self.settings.save()?;
        info!("Indexers set to {}", enabled);
        Ok(())
    }

    pub async fn start(&self) -> Result<()> {
        systemctl::start_service(SERVICE_NAME).await
    }

    pub async fn stop(&self) -> Result<()> {
        systemctl::stop_service(SERVICE_NAME).await
    }

    pub async fn restart(&self) -> Result<()> {
        systemctl::restart_service(SERVICE_NAME).await
    }

    /// Enable the unit at boot. A failing `systemctl enable` propagates.
    pub async fn enable(&self) -> Result<()> {
        systemctl::enable_service(SERVICE_NAME).await
    }

    /// systemd active-state of the unit (`active`, `inactive`, ...).
    pub async fn status(&self) -> Result<String> {
        systemctl::get_service_status(SERVICE_NAME).await
    }

    /// Point the service at a SABnzbd downloader.
    pub fn configure_sabnzbd(&mut self, host: &str, port: u16, api_key: &str) -> Result<()> {
        self.settings
            .set("sabnzbd", "host", &format!("{}:{}", host, port));
        self.settings.set("sabnzbd", "api_key", api_key);
        self.settings.save()?;
        info!("Sabnzbd configured at {}:{}", host, port);
        Ok(())
    }

    /// Point the service at a Plex media server, registering this machine by
    /// its fully-qualified domain name.
    pub async fn configure_plex(
        &mut self,
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<()> {
        self.settings.set("plex", "media_server", host);
        self.settings.set("plex", "port", &port.to_string());
        let fqdn = commands::machine_fqdn().await;
        self.settings.set("plex", "host", &fqdn);
        if let Some(username) = username {
            self.settings.set("plex", "username", username);
        }
        if let Some(password) = password {
            self.settings.set("plex", "password", password);
        }
        self.settings.save()?;
        info!("Plex media server configured at {}:{}", host, port);
        Ok(())
    }

    /// Set the URL base the service is served under.
    pub fn set_urlbase(&mut self, urlbase: &str) -> Result<()> {
        self.settings.set("core", "url_base", urlbase);
        self.settings.save()?;
        info!("Url base set to {}", urlbase);
        Ok(())
    }

    /// Restore the port invariant: the settings document's port must equal the
    /// configured port. Ports changed through the service's own UI are
    /// reverted. Idempotent.
    pub fn check_port(&mut self) -> Result<()> {
        self.reload_config()?;
        let current = self.settings.get("core", "port").map(|p| p.to_string());
        let expected = self.config.port.to_string();
        debug!("settings port: {:?}, configured port: {}", current, expected);

        if current.as_deref() != Some(expected.as_str()) {
            warn!(
                "Resetting Couch port to match deployment configuration, \
                 port should not be changed via couchpotato"
            );
            self.set_port()?;
        }
        Ok(())
    }

    /// Archive the database directory and settings file into the backup
    /// location, then prune archives past the retention count.
    pub async fn backup(&self) -> Result<BackupInfo> {
        info!("Creating backup");

        let backup_dir = &self.config.backup_location;
        backup::ensure_backup_dir(backup_dir)?;

        let filename = backup::archive_name(Local::now());
        let archive_path = backup_dir.join(&filename);
        let size_bytes = backup::create_archive(&self.paths, &archive_path)?;
        info!(
            "Backup created: {} ({} bytes)",
            archive_path.display(),
            size_bytes
        );

        if self.config.backup_count > 0 {
            info!("Pruning files in {}", backup_dir.display());
            let removed = backup::prune(backup_dir, self.config.backup_count as usize)?;
            if !removed.is_empty() {
                info!("Pruned {} old backup(s)", removed.len());
            }
        } else {
            info!("Skipping backup pruning");
        }

        Ok(BackupInfo {
            filename,
            size_bytes,
            path: archive_path,
        })
    }

    /// Install the recurring backup trigger in the system crontab, replacing
    /// any previous entry with the backup tag.
    pub async fn create_backup_cron(&self) -> Result<()> {
        self.remove_backup_cron_inner(false).await?;

        let entry = CronEntry {
            schedule: self.config.backup_cron.clone(),
            command: backup_command(&self.config)?,
            tag: BACKUP_CRON_TAG.to_string(),
        };
        self.cron.install(&entry).await?;
        info!("Backup cron created for: {}", self.config.backup_cron);
        Ok(())
    }

    /// Remove the backup trigger from the system crontab. Absence is benign.
    pub async fn remove_backup_cron(&self) -> Result<()> {
        self.remove_backup_cron_inner(true).await
    }

    async fn remove_backup_cron_inner(&self, log: bool) -> Result<()> {
        let removed = self.cron.remove(BACKUP_CRON_TAG).await?;
        if log {
            if removed {
                info!("Removed backup cron.");
            } else {
                warn!("Backup removal called, but cron not present.");
            }
        }
        Ok(())
    }
}

/// Command line the scheduled task runs: this binary's own backup operation.
fn backup_command(config: &DeployConfig) -> Result<String> {
    let exe = env::current_exe().context("Failed to resolve current executable")?;
    match &config.source {
        Some(path) => Ok(format!("{} --config {} backup", exe.display(), path.display())),
        None => Ok(format!("{} backup", exe.display())),
    }
}
