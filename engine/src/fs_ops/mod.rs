//! Filesystem adapter.
//!
//! `Filesystem` puts the local disk and the remote host behind one capability
//! interface so the sync and diff algorithms are written once. `Endpoints`
//! owns one adapter per side and moves bytes between them.

pub mod local;
pub mod remote;

pub use local::LocalFs;
pub use remote::RemoteFs;

use crate::checksums::{Checksum, ChecksumAlgorithm, ChecksumScope};
use crate::config::ComparePolicy;
use crate::error::{EngineError, Result};
use crate::model::{DirectoryEntry, Location, Side};
use crate::remote::{commands, RemoteSession};

/// Capability interface implemented once per side.
///
/// Handing an adapter a location of the other side is an error
/// (`WrongSide`) for fallible calls and a negative answer for queries.
pub trait Filesystem {
    fn side(&self) -> Side;

    /// Child location in this side's path grammar.
    fn join(&self, parent: &Location, name: &str) -> Result<Location>;

    /// Parent directory; the root is its own parent.
    fn parent(&self, location: &Location) -> Result<Location>;

    fn is_root(&self, location: &Location) -> bool;

    fn exists(&self, location: &Location) -> bool;

    /// True for a directory or a symbolic link to one.
    fn is_dir(&self, location: &Location) -> bool;

    /// True if the location itself is a symbolic link, whatever it points at.
    fn is_symlink(&self, location: &Location) -> bool;

    /// Canonical location with every symbolic link resolved.
    fn resolve(&self, location: &Location) -> Result<Location>;

    fn size(&self, location: &Location) -> Option<u64>;

    /// Raw directory contents, unordered, without "..". An entry's `is_dir`
    /// follows symbolic links.
    fn read_dir(&self, location: &Location) -> Result<Vec<DirectoryEntry>>;

    /// Create a directory. An existing directory is not an error.
    fn mkdir(&self, location: &Location) -> Result<()>;

    fn remove_file(&self, location: &Location) -> Result<()>;

    /// Remove an empty directory.
    fn remove_dir(&self, location: &Location) -> Result<()>;

    /// Digest of a file, or None if it does not exist or cannot be read.
    fn checksum(&self, location: &Location, algorithm: ChecksumAlgorithm, scope: ChecksumScope) -> Option<Checksum>;

    /// Directory contents in display order: directories first, then
    /// case-insensitive by name.
    fn entries(&self, location: &Location) -> Result<Vec<DirectoryEntry>> {
        let mut entries = self.read_dir(location)?;
        sort_entries(&mut entries);
        Ok(entries)
    }

    /// Listing for navigation: `entries` with ".." prepended below the root.
    /// Any access error yields an empty listing.
    fn list(&self, location: &Location) -> Vec<DirectoryEntry> {
        match self.entries(location) {
            Ok(mut entries) => {
                if !self.is_root(location) {
                    entries.insert(0, DirectoryEntry::parent());
                }
                entries
            }
            Err(e) => {
                tracing::debug!(location = %location.describe(), error = %e, "listing failed");
                Vec::new()
            }
        }
    }

    /// Remove a file, or a directory and everything beneath it.
    ///
    /// Symbolic links are unlinked, never descended into, so nothing outside
    /// `location` is touched. Walks with an explicit stack and keeps going
    /// past individual failures; the count of entries left behind is
    /// reported at the end.
    fn remove_tree(&self, location: &Location) -> Result<()> {
        if self.is_symlink(location) || !self.is_dir(location) {
            return self.remove_file(location);
        }

        let mut failures = 0usize;
        // (location, children already scheduled)
        let mut stack = vec![(location.clone(), false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                if let Err(e) = self.remove_dir(&current) {
                    tracing::warn!(location = %current.describe(), error = %e, "could not remove directory");
                    failures += 1;
                }
                continue;
            }

            stack.push((current.clone(), true));
            let children = match self.read_dir(&current) {
                Ok(children) => children,
                Err(e) => {
                    tracing::warn!(location = %current.describe(), error = %e, "could not list directory");
                    failures += 1;
                    continue;
                }
            };
            for child in children {
                let child_location = match self.join(&current, &child.name) {
                    Ok(loc) => loc,
                    Err(e) => {
                        tracing::warn!(error = %e, "could not build child path");
                        failures += 1;
                        continue;
                    }
                };
                if child.is_dir && !self.is_symlink(&child_location) {
                    stack.push((child_location, false));
                } else if let Err(e) = self.remove_file(&child_location) {
                    tracing::warn!(location = %child_location.describe(), error = %e, "could not remove file");
                    failures += 1;
                }
            }
        }

        if failures == 0 {
            Ok(())
        } else {
            Err(EngineError::RemovalIncomplete {
                path: location.to_string(),
                failures,
            })
        }
    }
}

/// Directories first, then case-insensitive name order.
pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });
}

pub(crate) fn wrong_side(location: &Location, expected: Side) -> EngineError {
    EngineError::WrongSide {
        location: location.describe(),
        expected: expected.to_string(),
    }
}

/// Diagnostic verb for a transfer between these locations.
pub fn transfer_verb(source: &Location, destination: &Location) -> &'static str {
    match (source.side(), destination.side()) {
        (Side::Local, Side::Remote) => "PUT",
        (Side::Remote, Side::Local) => "GET",
        _ => "COPY",
    }
}

/// The two adapters of a session.
pub struct Endpoints<S> {
    pub local: LocalFs,
    pub remote: RemoteFs<S>,
}

impl<S: RemoteSession> Endpoints<S> {
    pub fn new(session: S, policy: &ComparePolicy) -> Self {
        Endpoints {
            local: LocalFs::new(policy),
            remote: RemoteFs::new(session, policy),
        }
    }

    pub fn fs(&self, side: Side) -> &dyn Filesystem {
        match side {
            Side::Local => &self.local,
            Side::Remote => &self.remote,
        }
    }

    /// Move the bytes of one file. Remote bytes always travel over SFTP.
    pub fn transfer(&self, source: &Location, destination: &Location) -> Result<u64> {
        let session = self.remote.session();
        match (source, destination) {
            (Location::Local(from), Location::Remote(to)) => session.put(from, to),
            (Location::Remote(from), Location::Local(to)) => {
                local::ensure_parent_dir_exists(to)?;
                session.get(from, to)
            }
            (Location::Local(from), Location::Local(to)) => local::copy_file_with_metadata(from, to),
            (Location::Remote(from), Location::Remote(to)) => {
                let command = commands::copy(from, to);
                tracing::debug!(%command, "remote command");
                let output = session.execute(&command)?;
                if !output.success() {
                    return Err(EngineError::RemoteCommandFailed {
                        command,
                        exit_code: output.exit_code,
                        stderr: output.stderr_str(),
                    });
                }
                Ok(self.remote.size(destination).unwrap_or(0))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_entries_dirs_first_case_insensitive() {
        let mut entries = vec![
            DirectoryEntry::new("b.txt", false),
            DirectoryEntry::new("Zeta", true),
            DirectoryEntry::new("A.txt", false),
            DirectoryEntry::new("alpha", true),
        ];
        sort_entries(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "Zeta", "A.txt", "b.txt"]);
    }

    #[test]
    fn test_transfer_verbs() {
        let local = Location::local("/tmp/a");
        let remote = Location::remote("/srv/a");
        assert_eq!(transfer_verb(&local, &remote), "PUT");
        assert_eq!(transfer_verb(&remote, &local), "GET");
        assert_eq!(transfer_verb(&local, &local), "COPY");
    }
}
