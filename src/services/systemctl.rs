use anyhow::{anyhow, Result};
use tokio::process::Command as AsyncCommand;
use tracing::{debug, info};

use super::commands;

pub async fn get_service_status(service_name: &str) -> Result<String> {
    debug!("Checking service status: {}", service_name);

    let output = AsyncCommand::new("systemctl")
        .arg("is-active")
        .arg(service_name)
        .output()
        .await?;

    let status = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(status)
}

pub async fn start_service(service_name: &str) -> Result<()> {
    info!("Starting service: {}", service_name);
    run_systemctl("start", service_name).await
}

pub async fn stop_service(service_name: &str) -> Result<()> {
    info!("Stopping service: {}", service_name);
    run_systemctl("stop", service_name).await
}

pub async fn restart_service(service_name: &str) -> Result<()> {
    info!("Restarting service: {}", service_name);
    run_systemctl("restart", service_name).await
}

/// Enable the unit at boot. Goes through the shell, as the deployment
/// scripts do.
pub async fn enable_service(service_name: &str) -> Result<()> {
    commands::execute_shell_command(&format!("systemctl enable {}", service_name)).await?;
    info!("Service {} enabled", service_name);
    Ok(())
}

async fn run_systemctl(action: &str, service_name: &str) -> Result<()> {
    let output = AsyncCommand::new("systemctl")
        .arg(action)
        .arg(service_name)
        .output()
        .await?;

    if !output.status.success() {
        let error = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "Failed to {} service {}: {}",
            action,
            service_name,
            error
        ));
    }

    Ok(())
}
