use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Deployment configuration supplied by the orchestrating tool.
///
/// Read once at startup and injected into [`crate::ServiceManager`]; immutable
/// for the component's lifetime. Key names mirror the deployment tool's
/// schema, hence the kebab-case renames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Account the service runs as; all service paths derive from it.
    #[serde(rename = "couch-user")]
    pub couch_user: String,
    pub port: u16,
    #[serde(rename = "backup-location")]
    pub backup_location: PathBuf,
    /// Number of archives to keep. Zero or negative disables pruning.
    #[serde(rename = "backup-count")]
    pub backup_count: i64,
    /// Five-field cron schedule for the backup trigger.
    #[serde(rename = "backup-cron")]
    pub backup_cron: String,
    /// Where this configuration was loaded from, when known.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl DeployConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read deploy config {}: {}", path.display(), e))?;

        let mut config: DeployConfig = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse deploy config {}: {}", path.display(), e))?;
        config.source = Some(path.to_path_buf());

        info!(
            "Loaded deploy configuration for user {} (port {})",
            config.couch_user, config.port
        );
        Ok(config)
    }
}
