//! Directory browsing on either side.

use crate::fs_ops::Endpoints;
use crate::model::{DirectoryEntry, Location};
use crate::remote::RemoteSession;

/// Listing of `location` in display order, ".." first below the root.
/// Empty if the directory cannot be read.
pub fn list<S: RemoteSession>(endpoints: &Endpoints<S>, location: &Location) -> Vec<DirectoryEntry> {
    endpoints.fs(location.side()).list(location)
}

/// Resolve `target` relative to `current`.
///
/// ".." moves to the parent (the root stays put). Anything that is not an
/// existing directory leaves the location unchanged.
pub fn change_directory<S: RemoteSession>(
    endpoints: &Endpoints<S>,
    current: &Location,
    target: &str,
) -> Location {
    let fs = endpoints.fs(current.side());
    if target == DirectoryEntry::PARENT {
        return fs.parent(current).unwrap_or_else(|_| current.clone());
    }
    if target.is_empty() || target == "." {
        return current.clone();
    }

    match fs.join(current, target) {
        Ok(next) if fs.is_dir(&next) => next,
        _ => {
            tracing::debug!(current = %current.describe(), %target, "not a directory, staying");
            current.clone()
        }
    }
}
