use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::error::{BridgeError, BridgeResult};
use crate::{FileStatus, VersionControlBridge};

pub const DEFAULT_GIT_TIMEOUT_SEC: u64 = 10;

const GIT: &str = "git";

/// [`VersionControlBridge`] that shells out to the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    timeout_sec: u64,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            timeout_sec: DEFAULT_GIT_TIMEOUT_SEC,
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout_sec(mut self, timeout_sec: u64) -> Self {
        self.timeout_sec = timeout_sec.max(1);
        self
    }

    fn run(&self, repo_path: &Path, args: &[&str]) -> BridgeResult<String> {
        let mut child = Command::new(GIT)
            .args(args)
            .current_dir(repo_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                program: GIT,
                source,
            })?;

        // Drain both pipes while waiting; a full pipe would block git forever.
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = match child.wait_timeout(Duration::from_secs(self.timeout_sec)) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BridgeError::Timeout {
                    program: GIT,
                    timeout_sec: self.timeout_sec,
                });
            }
            Err(source) => {
                let _ = child.kill();
                return Err(BridgeError::Spawn {
                    program: GIT,
                    source,
                });
            }
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();
        if !status.success() {
            return Err(BridgeError::CommandFailed {
                program: GIT,
                status: format_exit_status(status),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(stdout)
    }
}

impl VersionControlBridge for GitCli {
    fn status(&self, repo_path: &Path) -> BridgeResult<Vec<FileStatus>> {
        let output = self.run(repo_path, &["status", "--porcelain"])?;
        Ok(parse_porcelain_status(&output))
    }

    fn current_branch(&self, repo_path: &Path) -> BridgeResult<String> {
        let output = self.run(repo_path, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(output.trim().to_string())
    }
}

/// Parses `git status --porcelain` (v1) output.
///
/// Renames keep only the destination path.
pub fn parse_porcelain_status(output: &str) -> Vec<FileStatus> {
    output
        .lines()
        .filter(|line| line.len() > 3)
        .filter_map(|line| {
            let code = line.get(..2)?;
            let path = line.get(3..)?;
            let path = path.rsplit(" -> ").next().unwrap_or(path);
            Some(FileStatus {
                path: path.trim_matches('"').to_string(),
                code: code.to_string(),
            })
        })
        .collect()
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || read_pipe(pipe))
}

fn read_pipe(pipe: Option<impl Read>) -> String {
    let Some(mut pipe) = pipe else {
        return String::new();
    };

    let mut bytes = Vec::new();
    let _ = pipe.read_to_end(&mut bytes);
    String::from_utf8_lossy(&bytes).into_owned()
}

fn format_exit_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit_code={code}"),
        None => "terminated_by_signal".to_string(),
    }
}
