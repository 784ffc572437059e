//! Loopback `RemoteSession` for tests.
//!
//! "Remote" paths are absolute paths on this machine. Commands run through
//! `sh -c`, so the digest and stat commands are the same ones an SSH host
//! would run. Transfers are counted and can be made to fail by file name.

use crate::error::{EngineError, Result};
use crate::remote::{CommandOutput, RemoteEntry, RemoteSession, RemoteStat};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::process::Command;

#[derive(Default)]
pub struct LoopbackSession {
    gets: Cell<usize>,
    puts: Cell<usize>,
    commands: RefCell<Vec<String>>,
    failing: RefCell<HashSet<String>>,
}

impl LoopbackSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every transfer whose source file is called `name` fail.
    pub fn fail_transfers_of(self, name: &str) -> Self {
        self.failing.borrow_mut().insert(name.to_string());
        self
    }

    pub fn gets(&self) -> usize {
        self.gets.get()
    }

    pub fn puts(&self) -> usize {
        self.puts.get()
    }

    pub fn transfers(&self) -> usize {
        self.gets() + self.puts()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    fn check_injected(&self, from: &Path, to: &str) -> Result<()> {
        let name = from
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing.borrow().contains(&name) {
            return Err(EngineError::TransferFailed {
                from: from.display().to_string(),
                to: to.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

impl RemoteSession for LoopbackSession {
    fn execute(&self, command: &str) -> Result<CommandOutput> {
        self.commands.borrow_mut().push(command.to_string());
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .map_err(|e| EngineError::Session { message: e.to_string() })?;
        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    fn get(&self, remote: &str, local: &Path) -> Result<u64> {
        self.gets.set(self.gets.get() + 1);
        self.check_injected(Path::new(remote), &local.display().to_string())?;
        fs::copy(remote, local).map_err(|e| EngineError::TransferFailed {
            from: remote.to_string(),
            to: local.display().to_string(),
            message: e.to_string(),
        })
    }

    fn put(&self, local: &Path, remote: &str) -> Result<u64> {
        self.puts.set(self.puts.get() + 1);
        self.check_injected(local, remote)?;
        fs::copy(local, remote).map_err(|e| EngineError::TransferFailed {
            from: local.display().to_string(),
            to: remote.to_string(),
            message: e.to_string(),
        })
    }

    fn stat(&self, path: &str) -> Result<RemoteStat> {
        let metadata = fs::metadata(path).map_err(|e| EngineError::remote_io(path, e))?;
        Ok(RemoteStat {
            is_dir: metadata.is_dir(),
            is_symlink: false,
            size: Some(metadata.len()),
        })
    }

    fn lstat(&self, path: &str) -> Result<RemoteStat> {
        let metadata = fs::symlink_metadata(path).map_err(|e| EngineError::remote_io(path, e))?;
        Ok(RemoteStat {
            is_dir: metadata.is_dir(),
            is_symlink: metadata.file_type().is_symlink(),
            size: Some(metadata.len()),
        })
    }

    fn realpath(&self, path: &str) -> Result<String> {
        let resolved = fs::canonicalize(path).map_err(|e| EngineError::remote_io(path, e))?;
        Ok(resolved.to_string_lossy().into_owned())
    }

    fn listdir(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| EngineError::remote_io(path, e))? {
            let entry = entry.map_err(|e| EngineError::remote_io(path, e))?;
            let is_dir = fs::metadata(entry.path()).map(|m| m.is_dir()).unwrap_or(false);
            entries.push(RemoteEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        Ok(entries)
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        fs::create_dir(path).map_err(|e| EngineError::remote_io(path, e))
    }

    fn remove(&self, path: &str) -> Result<()> {
        fs::remove_file(path).map_err(|e| EngineError::remote_io(path, e))
    }

    fn rmdir(&self, path: &str) -> Result<()> {
        fs::remove_dir(path).map_err(|e| EngineError::remote_io(path, e))
    }
}

/// Deterministic content of `len` bytes; different seeds give different bytes
/// at every position.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| ((i % 251) as u8).wrapping_add(seed))
        .collect()
}

pub fn remote_location(path: &Path) -> crate::model::Location {
    crate::model::Location::remote(path.to_str().expect("utf-8 temp path"))
}
