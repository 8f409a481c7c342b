//! Consumer for `file_modified` notifications.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cowork_bridge::FileSystemBridge;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Re-reads each modified file through `fs` so editor views can pick up
/// the new content. Relative paths resolve against `work_dir`. Ends when
/// every sender is dropped.
pub fn spawn_refresh_consumer(
    fs: Arc<dyn FileSystemBridge>,
    work_dir: PathBuf,
    mut paths: mpsc::UnboundedReceiver<PathBuf>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut refreshed = 0;
        while let Some(path) = paths.recv().await {
            if refresh_one(fs.as_ref(), &work_dir, &path) {
                refreshed += 1;
            }
        }
        refreshed
    })
}

fn refresh_one(fs: &dyn FileSystemBridge, work_dir: &Path, path: &Path) -> bool {
    let resolved = work_dir.join(path);
    match fs.read(&resolved) {
        Ok(content) => {
            info!(path = %resolved.display(), bytes = content.len(), "file refreshed");
            true
        }
        Err(error) => {
            warn!(path = %resolved.display(), %error, "file refresh failed");
            false
        }
    }
}
