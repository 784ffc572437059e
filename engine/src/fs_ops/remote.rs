//! Remote adapter: filesystem capabilities expressed through a
//! `RemoteSession`. Existence, size and digests come from shell commands run
//! on the host; listing and mutation go through SFTP.

use super::{wrong_side, Filesystem};
use crate::checksums::{Checksum, ChecksumAlgorithm, ChecksumScope};
use crate::config::ComparePolicy;
use crate::error::Result;
use crate::model::{DirectoryEntry, Location, Side};
use crate::remote::{commands, RemoteSession};

pub struct RemoteFs<S> {
    session: S,
    partial_limit_mb: u64,
}

impl<S: RemoteSession> RemoteFs<S> {
    pub fn new(session: S, policy: &ComparePolicy) -> Self {
        RemoteFs {
            session,
            partial_limit_mb: policy.partial_limit_mb,
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    fn path<'a>(&self, location: &'a Location) -> Result<&'a str> {
        location
            .remote_path()
            .ok_or_else(|| wrong_side(location, Side::Remote))
    }
}

/// POSIX join with explicit root handling.
pub fn join_remote(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }
}

/// POSIX dirname; "/" is its own parent.
pub fn parent_remote(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
    }
}

impl<S: RemoteSession> Filesystem for RemoteFs<S> {
    fn side(&self) -> Side {
        Side::Remote
    }

    fn join(&self, parent: &Location, name: &str) -> Result<Location> {
        Ok(Location::remote(join_remote(self.path(parent)?, name)))
    }

    fn parent(&self, location: &Location) -> Result<Location> {
        Ok(Location::remote(parent_remote(self.path(location)?)))
    }

    fn is_root(&self, location: &Location) -> bool {
        matches!(self.path(location), Ok("/"))
    }

    fn exists(&self, location: &Location) -> bool {
        match self.path(location) {
            Ok(path) => self.session.lstat(path).is_ok(),
            Err(_) => false,
        }
    }

    fn is_dir(&self, location: &Location) -> bool {
        match self.path(location) {
            Ok(path) => self.session.stat(path).map(|s| s.is_dir).unwrap_or(false),
            Err(_) => false,
        }
    }

    fn is_symlink(&self, location: &Location) -> bool {
        match self.path(location) {
            Ok(path) => self.session.lstat(path).map(|s| s.is_symlink).unwrap_or(false),
            Err(_) => false,
        }
    }

    fn resolve(&self, location: &Location) -> Result<Location> {
        Ok(Location::remote(self.session.realpath(self.path(location)?)?))
    }

    fn size(&self, location: &Location) -> Option<u64> {
        self.session.stat_size(self.path(location).ok()?)
    }

    fn read_dir(&self, location: &Location) -> Result<Vec<DirectoryEntry>> {
        let path = self.path(location)?;
        Ok(self
            .session
            .listdir(path)?
            .into_iter()
            .map(|entry| DirectoryEntry::new(entry.name, entry.is_dir))
            .collect())
    }

    fn mkdir(&self, location: &Location) -> Result<()> {
        let path = self.path(location)?;
        match self.session.mkdir(path) {
            Ok(()) => Ok(()),
            Err(_) if self.is_dir(location) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn remove_file(&self, location: &Location) -> Result<()> {
        self.session.remove(self.path(location)?)
    }

    fn remove_dir(&self, location: &Location) -> Result<()> {
        self.session.rmdir(self.path(location)?)
    }

    /// Runs the digest tool on the host; the file is never downloaded.
    fn checksum(&self, location: &Location, algorithm: ChecksumAlgorithm, scope: ChecksumScope) -> Option<Checksum> {
        let path = self.path(location).ok()?;
        if !self.session.status_check(path) {
            return None;
        }

        let command = commands::digest(path, algorithm, scope, self.partial_limit_mb);
        tracing::debug!(%command, "remote command");
        let output = match self.session.execute(&command) {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(error = %e, "remote checksum failed");
                return None;
            }
        };
        if !output.success() {
            tracing::debug!(exit_code = output.exit_code, stderr = %output.stderr_str(), "remote checksum failed");
            return None;
        }

        let hex = commands::parse_digest(&output.stdout_str())?;
        tracing::debug!(%path, %algorithm, %scope, digest = %hex, "remote checksum");
        Some(Checksum::new(algorithm, scope, hex))
    }
}
