//! Contracts for the collaborators the protocol client talks to at its edges.
//!
//! The client forwards `file_modified` paths to a [`FileSystemBridge`],
//! surfaces approval traffic through an [`ApprovalPrompt`], and the front end
//! queries a [`VersionControlBridge`] for repository state. Each contract
//! ships with a local implementation backed by the host machine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

mod error;
mod fs;
mod git;

pub use error::{BridgeError, BridgeResult};
pub use fs::{LocalFileSystem, DEFAULT_READ_MAX_BYTES};
pub use git::{parse_porcelain_status, GitCli, DEFAULT_GIT_TIMEOUT_SEC};

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
}

/// File-system access on behalf of the conversation.
pub trait FileSystemBridge: Send + Sync {
    fn read(&self, path: &Path) -> BridgeResult<String>;

    fn write(&self, path: &Path, content: &str) -> BridgeResult<()>;

    /// Directories first, then files, each group sorted by name.
    fn list(&self, path: &Path) -> BridgeResult<Vec<DirEntry>>;
}

/// Working-tree state of one path, as reported by the VCS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    pub path: String,
    /// Two-letter index/worktree code, e.g. `" M"` or `"??"`.
    pub code: String,
}

impl FileStatus {
    pub fn is_untracked(&self) -> bool {
        self.code == "??"
    }
}

pub trait VersionControlBridge: Send + Sync {
    fn status(&self, repo_path: &Path) -> BridgeResult<Vec<FileStatus>>;

    fn current_branch(&self, repo_path: &Path) -> BridgeResult<String>;
}

/// Approval traffic forwarded from the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRequest {
    pub tool: Option<String>,
    pub args: Option<Value>,
    pub message: Option<String>,
}

/// UI-confirmation collaborator.
///
/// Called synchronously from the frame loop, so implementations must not
/// block; anything slow belongs on another task.
pub trait ApprovalPrompt: Send + Sync {
    fn approval_requested(&self, request: &ApprovalRequest);

    fn tool_approved(&self, auto: bool);
}
