use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use couchctl::{DeployConfig, ServiceManager, SystemCrontab};

#[derive(Parser)]
#[command(
    name = "couchctl",
    about = "Manage a CouchPotato service instance",
    version
)]
struct Cli {
    /// Deployment configuration file
    #[arg(long, default_value = "/etc/couchctl/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the service
    Start,
    /// Stop the service
    Stop,
    /// Restart the service
    Restart,
    /// Enable the service at boot
    Enable,
    /// Print the systemd active-state of the service
    Status,
    /// Set the hostname the service binds to
    SetHost { hostname: String },
    /// Align the service port with the deployment configuration
    SetPort,
    /// Enable or disable the newznab indexers
    SetIndexers {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    /// Point the service at a SABnzbd downloader
    ConfigureSabnzbd {
        #[arg(long)]
        host: String,
        #[arg(long)]
        port: u16,
        #[arg(long)]
        api_key: String,
    },
    /// Point the service at a Plex media server
    ConfigurePlex {
        #[arg(long)]
        host: String,
        #[arg(long)]
        port: u16,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Set the URL base the service is served under
    SetUrlbase { urlbase: String },
    /// Restore the configured port if the settings drifted
    CheckPort,
    /// Archive the service state and prune old backups
    Backup,
    /// Install the recurring backup trigger in the root crontab
    InstallBackupCron,
    /// Remove the backup trigger from the root crontab
    RemoveBackupCron,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = DeployConfig::load(&cli.config).await?;
    let mut manager = ServiceManager::new(config, SystemCrontab::root())?;

    match cli.command {
        Command::Start => manager.start().await?,
        Command::Stop => manager.stop().await?,
        Command::Restart => manager.restart().await?,
        Command::Enable => manager.enable().await?,
        Command::Status => {
            let status = manager.status().await?;
            println!("{}", status);
        }
        Command::SetHost { hostname } => manager.set_host(&hostname)?,
        Command::SetPort => manager.set_port()?,
        Command::SetIndexers { enabled } => manager.set_indexers(enabled)?,
        Command::ConfigureSabnzbd {
            host,
            port,
            api_key,
        } => manager.configure_sabnzbd(&host, port, &api_key)?,
        Command::ConfigurePlex {
            host,
            port,
            username,
            password,
        } => {
            manager
                .configure_plex(&host, port, username.as_deref(), password.as_deref())
                .await?
        }
        Command::SetUrlbase { urlbase } => manager.set_urlbase(&urlbase)?,
        Command::CheckPort => manager.check_port()?,
        Command::Backup => {
            let info = manager.backup().await?;
            println!("{}", info.path.display());
        }
        Command::InstallBackupCron => manager.create_backup_cron().await?,
        Command::RemoveBackupCron => manager.remove_backup_cron().await?,
    }

    Ok(())
}
