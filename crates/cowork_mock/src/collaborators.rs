use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cowork_bridge::{
    ApprovalPrompt, ApprovalRequest, BridgeError, BridgeResult, DirEntry, FileSystemBridge,
};

use crate::lock_unpoisoned;

/// [`ApprovalPrompt`] that records what it was shown.
#[derive(Debug, Default)]
pub struct RecordingApprovalPrompt {
    requests: Mutex<Vec<ApprovalRequest>>,
    approvals: Mutex<Vec<bool>>,
}

impl RecordingApprovalPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<ApprovalRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    /// `auto` flags of the `tool_approved` notifications seen.
    pub fn approvals(&self) -> Vec<bool> {
        lock_unpoisoned(&self.approvals).clone()
    }
}

impl ApprovalPrompt for RecordingApprovalPrompt {
    fn approval_requested(&self, request: &ApprovalRequest) {
        lock_unpoisoned(&self.requests).push(request.clone());
    }

    fn tool_approved(&self, auto: bool) {
        lock_unpoisoned(&self.approvals).push(auto);
    }
}

/// [`FileSystemBridge`] over an in-memory map of files. Directories exist
/// implicitly as prefixes of file paths.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, String>>,
    reads: Mutex<Vec<PathBuf>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        lock_unpoisoned(&self.files).insert(path.into(), content.into());
        self
    }

    /// Paths passed to `read`, in call order.
    pub fn reads(&self) -> Vec<PathBuf> {
        lock_unpoisoned(&self.reads).clone()
    }
}

impl FileSystemBridge for MemoryFileSystem {
    fn read(&self, path: &Path) -> BridgeResult<String> {
        lock_unpoisoned(&self.reads).push(path.to_path_buf());
        lock_unpoisoned(&self.files)
            .get(path)
            .cloned()
            .ok_or_else(|| not_found("read", path))
    }

    fn write(&self, path: &Path, content: &str) -> BridgeResult<()> {
        lock_unpoisoned(&self.files).insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn list(&self, path: &Path) -> BridgeResult<Vec<DirEntry>> {
        let files = lock_unpoisoned(&self.files);
        let mut entries: BTreeMap<String, DirEntry> = BTreeMap::new();
        for file in files.keys() {
            let Ok(relative) = file.strip_prefix(path) else {
                continue;
            };
            let mut components = relative.components();
            let Some(first) = components.next() else {
                continue;
            };
            let name = first.as_os_str().to_string_lossy().into_owned();
            let is_directory = components.next().is_some();
            entries
                .entry(name.clone())
                .and_modify(|entry| entry.is_directory |= is_directory)
                .or_insert_with(|| DirEntry {
                    path: path.join(&name),
                    name,
                    is_directory,
                });
        }

        if entries.is_empty() {
            return Err(not_found("list", path));
        }
        let mut entries: Vec<DirEntry> = entries.into_values().collect();
        entries.sort_by(|left, right| {
            right
                .is_directory
                .cmp(&left.is_directory)
                .then_with(|| left.name.cmp(&right.name))
        });
        Ok(entries)
    }
}

fn not_found(op: &'static str, path: &Path) -> BridgeError {
    BridgeError::Io {
        op,
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::NotFound, "no such file in memory"),
    }
}
