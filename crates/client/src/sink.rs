//! Download destinations.
//!
//! A [`DownloadSink`] receives the bytes of a downloaded file. The
//! [`DirectorySink`] writes them atomically into a local directory: data goes
//! to a hidden temporary file first and is renamed into place once complete.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while saving a download.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The remote name cannot be used as a local file name.
    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for downloaded files.
pub trait DownloadSink: Send + Sync {
    /// Save `data` under `name`, returning where it was stored.
    fn save(&self, name: &str, data: &[u8]) -> Result<PathBuf, SinkError>;
}

/// Reject names that could escape the destination directory.
fn validate_name(name: &str) -> Result<(), SinkError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(SinkError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Writes downloads into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    directory: PathBuf,
}

impl DirectorySink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, name: &str, data: &[u8]) -> Result<PathBuf, SinkError> {
        validate_name(name)?;
        fs::create_dir_all(&self.directory)?;

        let target = self.directory.join(name);
        let temp_path = self.directory.join(format!(".{}.part", name));

        let written = fs::File::create(&temp_path).and_then(|mut file| {
            file.write_all(data)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|_| fs::rename(&temp_path, &target)) {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                warn!(path = ?temp_path, error = %cleanup, "Failed to cleanup partial download");
            }
            return Err(SinkError::Io(e));
        }

        debug!(path = ?target, bytes = data.len(), "Download saved");
        Ok(target)
    }
}

/// Keeps downloads in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents saved under `name`.
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DownloadSink for MemorySink {
    fn save(&self, name: &str, data: &[u8]) -> Result<PathBuf, SinkError> {
        validate_name(name)?;
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.to_string(), data.to_vec());
        Ok(PathBuf::from(name))
    }
}
