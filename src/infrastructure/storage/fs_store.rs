use crate::domain::storage::StateStore;
use crate::error::Result;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

const TEMP_SUFFIX: &str = "tmp";

/// Keeps the last notified value in a single text file.
#[derive(Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_dir(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(TEMP_SUFFIX);
        self.path.with_file_name(name)
    }
}

impl StateStore for FileStateStore {
    fn read_last(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.trim().to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_last(&self, value: &str) -> Result<()> {
        self.ensure_dir()?;

        // Readers only ever see the old or the new value.
        let temp = self.temp_path();
        fs::write(&temp, value.trim())?;
        fs::rename(&temp, &self.path)?;

        info!("Saved state {:?} to {:?}", value, self.path);
        Ok(())
    }
}
