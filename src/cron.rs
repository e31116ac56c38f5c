//! Tagged entries in the system crontab.
//!
//! Each managed task is one row of the form `<schedule> <command> # <tag>`.
//! The tag is the lookup key: install replaces any row carrying it, remove
//! drops it. Unmanaged rows pass through untouched.

use anyhow::Result;
use tracing::debug;

use crate::services::commands;

/// One managed crontab row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronEntry {
    /// Five-field cron schedule, e.g. `0 3 * * *`.
    pub schedule: String,
    pub command: String,
    pub tag: String,
}

impl CronEntry {
    pub fn render(&self) -> String {
        format!("{} {} # {}", self.schedule, self.command, self.tag)
    }

    /// Parse a crontab row into a managed entry. Rows that are blank,
    /// comments, or carry no tag marker yield `None`.
    pub fn parse(line: &str) -> Option<CronEntry> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (body, tag) = line.rsplit_once(" # ")?;
        let fields: Vec<&str> = body.split_whitespace().collect();
        if fields.len() < 6 {
            return None;
        }
        Some(CronEntry {
            schedule: fields[..5].join(" "),
            command: fields[5..].join(" "),
            tag: tag.trim().to_string(),
        })
    }
}

fn line_tag(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    trimmed.rsplit_once(" # ").map(|(_, tag)| tag.trim())
}

/// Crontab text with `entry` installed, replacing any row with the same tag.
pub fn render_install(raw: &str, entry: &CronEntry) -> String {
    let mut lines: Vec<&str> = raw
        .lines()
        .filter(|line| line_tag(line) != Some(entry.tag.as_str()))
        .collect();
    let rendered = entry.render();
    lines.push(&rendered);
    let mut content = lines.join("\n");
    content.push('\n');
    content
}

/// Crontab text with the tagged row removed, or `None` when no row carries
/// the tag.
pub fn render_remove(raw: &str, tag: &str) -> Option<String> {
    let total = raw.lines().count();
    let kept: Vec<&str> = raw
        .lines()
        .filter(|line| line_tag(line) != Some(tag))
        .collect();
    if kept.len() == total {
        return None;
    }
    let mut content = kept.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    Some(content)
}

/// Store of tagged scheduled-task entries.
///
/// The production implementation talks to the root crontab; tests substitute
/// an in-memory fake.
#[allow(async_fn_in_trait)]
pub trait CronStore {
    /// Managed (tagged) entries currently present.
    async fn entries(&self) -> Result<Vec<CronEntry>>;

    /// Add `entry`, replacing any existing entry with the same tag.
    async fn install(&self, entry: &CronEntry) -> Result<()>;

    /// Remove the entry carrying `tag`, reporting whether one was present.
    async fn remove(&self, tag: &str) -> Result<bool>;
}

/// A user's system crontab, driven through `crontab(1)`.
pub struct SystemCrontab {
    user: String,
}

impl SystemCrontab {
    pub fn root() -> Self {
        Self::for_user("root")
    }

    pub fn for_user(user: &str) -> Self {
        Self {
            user: user.to_string(),
        }
    }

    async fn read_raw(&self) -> Result<String> {
        match commands::execute_shell_command(&format!("crontab -l -u {}", self.user)).await {
            Ok(text) => Ok(text),
            // An account without a crontab yet reads as empty.
            Err(e) if e.to_string().contains("no crontab for") => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    async fn write_raw(&self, content: &str) -> Result<()> {
        commands::execute_with_stdin("crontab", &["-u", &self.user, "-"], content).await?;
        Ok(())
    }
}

impl CronStore for SystemCrontab {
    async fn entries(&self) -> Result<Vec<CronEntry>> {
        let raw = self.read_raw().await?;
        Ok(raw.lines().filter_map(CronEntry::parse).collect())
    }

    async fn install(&self, entry: &CronEntry) -> Result<()> {
        let raw = self.read_raw().await?;
        debug!("Installing crontab entry tagged '{}'", entry.tag);
        self.write_raw(&render_install(&raw, entry)).await
    }

    async fn remove(&self, tag: &str) -> Result<bool> {
        let raw = self.read_raw().await?;
        match render_remove(&raw, tag) {
            Some(content) => {
                debug!("Removing crontab entry tagged '{}'", tag);
                self.write_raw(&content).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
