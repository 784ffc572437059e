//! The remote session collaborator.
//!
//! Everything the engine knows about the remote host goes through
//! `RemoteSession`: shell commands for existence, size and digests, SFTP
//! primitives for listing, directory changes and byte transfer.

pub mod commands;
pub mod ssh;

pub use ssh::SshSession;

use crate::error::Result;
use std::path::Path;

/// Captured result of one remote command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteStat {
    pub is_dir: bool,
    /// Only ever set by `lstat`.
    pub is_symlink: bool,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Command execution and file transfer against one remote host.
///
/// All calls block until complete. Implementations share one connection for
/// commands and transfers and never reconnect.
pub trait RemoteSession {
    /// Run a shell command and wait for it to exit.
    fn execute(&self, command: &str) -> Result<CommandOutput>;

    /// Download `remote` into `local`, returning the number of bytes moved.
    fn get(&self, remote: &str, local: &Path) -> Result<u64>;

    /// Upload `local` to `remote`, returning the number of bytes moved.
    fn put(&self, local: &Path, remote: &str) -> Result<u64>;

    /// Attributes of `path`, following symbolic links.
    fn stat(&self, path: &str) -> Result<RemoteStat>;

    /// Attributes of `path` itself; a symbolic link is reported as a link.
    fn lstat(&self, path: &str) -> Result<RemoteStat>;

    /// Canonical absolute path with every symbolic link resolved.
    fn realpath(&self, path: &str) -> Result<String>;

    /// Entries of a directory, without "." and "..". `is_dir` follows
    /// symbolic links.
    fn listdir(&self, path: &str) -> Result<Vec<RemoteEntry>>;

    fn mkdir(&self, path: &str) -> Result<()>;

    fn remove(&self, path: &str) -> Result<()>;

    fn rmdir(&self, path: &str) -> Result<()>;

    /// True if `path` is a regular file (`test -f` exits 0).
    fn status_check(&self, path: &str) -> bool {
        let command = commands::file_test(path);
        tracing::debug!(%command, "remote command");
        matches!(self.execute(&command), Ok(output) if output.success())
    }

    /// Size reported by `stat -c %s`, if the command succeeds with a purely
    /// numeric output.
    fn stat_size(&self, path: &str) -> Option<u64> {
        let command = commands::file_size(path);
        tracing::debug!(%command, "remote command");
        match self.execute(&command) {
            Ok(output) if output.success() => commands::parse_size(&output.stdout_str()),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "size query failed");
                None
            }
        }
    }
}
