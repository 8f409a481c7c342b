use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{BridgeError, BridgeResult};
use crate::{DirEntry, FileSystemBridge};

/// Files at or above this size are refused by [`LocalFileSystem::read`].
pub const DEFAULT_READ_MAX_BYTES: u64 = 100 * 1024;

/// [`FileSystemBridge`] over the local disk.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    read_max_bytes: u64,
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self {
            read_max_bytes: DEFAULT_READ_MAX_BYTES,
        }
    }
}

impl LocalFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_max_bytes(mut self, read_max_bytes: u64) -> Self {
        self.read_max_bytes = read_max_bytes;
        self
    }
}

impl FileSystemBridge for LocalFileSystem {
    fn read(&self, path: &Path) -> BridgeResult<String> {
        let metadata = fs::metadata(path).map_err(|error| BridgeError::io("stat", path, error))?;
        if metadata.len() >= self.read_max_bytes {
            return Err(BridgeError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: self.read_max_bytes,
            });
        }

        let bytes = fs::read(path).map_err(|error| BridgeError::io("read", path, error))?;
        String::from_utf8(bytes).map_err(|_| BridgeError::NotText {
            path: path.to_path_buf(),
        })
    }

    fn write(&self, path: &Path, content: &str) -> BridgeResult<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| BridgeError::io("create", parent, error))?;
        }
        fs::write(path, content).map_err(|error| BridgeError::io("write", path, error))?;
        debug!(path = %path.display(), bytes = content.len(), "wrote file");
        Ok(())
    }

    fn list(&self, path: &Path) -> BridgeResult<Vec<DirEntry>> {
        let reader = fs::read_dir(path).map_err(|error| BridgeError::io("list", path, error))?;

        let mut entries = Vec::new();
        for entry in reader {
            let entry = entry.map_err(|error| BridgeError::io("list", path, error))?;
            let is_directory = entry
                .file_type()
                .map(|file_type| file_type.is_dir())
                .unwrap_or(false);
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                is_directory,
            });
        }

        entries.sort_by(|left, right| {
            right
                .is_directory
                .cmp(&left.is_directory)
                .then_with(|| left.name.cmp(&right.name))
        });
        Ok(entries)
    }
}
