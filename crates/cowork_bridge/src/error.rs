use std::path::PathBuf;

use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exceeds max read size ({size} bytes > {limit} bytes)", .path.display())]
    TooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    #[error("{} is not valid UTF-8 text", .path.display())]
    NotText { path: PathBuf },

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout_sec}s")]
    Timeout {
        program: &'static str,
        timeout_sec: u64,
    },

    #[error("{program} failed ({status}): {stderr}")]
    CommandFailed {
        program: &'static str,
        status: String,
        stderr: String,
    },
}

impl BridgeError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }
}
