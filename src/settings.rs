use anyhow::{anyhow, Result};
use ini::Ini;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The service's own INI settings document, distinct from the deployment
/// configuration.
///
/// Mutations touch the in-memory document only; [`SettingsFile::save`]
/// persists it as a whole-file overwrite. The write is not atomic, so a crash
/// mid-write can corrupt the file.
pub struct SettingsFile {
    path: PathBuf,
    doc: Ini,
}

impl SettingsFile {
    /// Parse the document at `path`. A missing file yields an empty document.
    pub fn open(path: PathBuf) -> Result<Self> {
        let doc = Self::read_document(&path)?;
        Ok(Self { path, doc })
    }

    fn read_document(path: &Path) -> Result<Ini> {
        match Ini::load_from_file(path) {
            Ok(doc) => Ok(doc),
            Err(ini::Error::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(Ini::new()),
            Err(e) => Err(anyhow!(
                "Failed to parse settings file {}: {}",
                path.display(),
                e
            )),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop in-memory state and re-read from disk.
    pub fn reload(&mut self) -> Result<()> {
        self.doc = Self::read_document(&self.path)?;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.doc.write_to_file(&self.path).map_err(|e| {
            anyhow!(
                "Failed to write settings file {}: {}",
                self.path.display(),
                e
            )
        })
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.doc.get_from(Some(section), key)
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        debug!("settings: [{}] {} = {}", section, key, value);
        self.doc.with_section(Some(section)).set(key, value);
    }
}
