//! Local disk adapter.
//!
//! Direct OS calls. `is_dir` follows symbolic links so a copy walks into a
//! linked directory; `is_symlink` keeps tree removal inside its root.

use super::{wrong_side, Filesystem};
use crate::checksums::{compute_local_checksum, Checksum, ChecksumAlgorithm, ChecksumScope};
use crate::config::ComparePolicy;
use crate::error::{EngineError, Result};
use crate::model::{DirectoryEntry, Location, Side};
use std::fs;
use std::io;
use std::path::Path;

pub struct LocalFs {
    chunk_size: usize,
    partial_limit_mb: u64,
}

impl LocalFs {
    pub fn new(policy: &ComparePolicy) -> Self {
        LocalFs {
            chunk_size: policy.chunk_size,
            partial_limit_mb: policy.partial_limit_mb,
        }
    }

    fn path<'a>(&self, location: &'a Location) -> Result<&'a Path> {
        location
            .local_path()
            .ok_or_else(|| wrong_side(location, Side::Local))
    }
}

impl Filesystem for LocalFs {
    fn side(&self) -> Side {
        Side::Local
    }

    fn join(&self, parent: &Location, name: &str) -> Result<Location> {
        Ok(Location::local(self.path(parent)?.join(name)))
    }

    fn parent(&self, location: &Location) -> Result<Location> {
        let path = self.path(location)?;
        Ok(Location::local(path.parent().unwrap_or(path)))
    }

    fn is_root(&self, location: &Location) -> bool {
        matches!(self.path(location), Ok(path) if path.parent().is_none())
    }

    fn exists(&self, location: &Location) -> bool {
        matches!(self.path(location), Ok(path) if fs::symlink_metadata(path).is_ok())
    }

    fn is_dir(&self, location: &Location) -> bool {
        matches!(self.path(location), Ok(path) if path.is_dir())
    }

    fn is_symlink(&self, location: &Location) -> bool {
        match self.path(location) {
            Ok(path) => fs::symlink_metadata(path)
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    fn resolve(&self, location: &Location) -> Result<Location> {
        let path = self.path(location)?;
        let resolved = fs::canonicalize(path).map_err(|e| EngineError::local_io(path, e))?;
        Ok(Location::local(resolved))
    }

    fn size(&self, location: &Location) -> Option<u64> {
        let path = self.path(location).ok()?;
        fs::metadata(path).ok().map(|m| m.len())
    }

    fn read_dir(&self, location: &Location) -> Result<Vec<DirectoryEntry>> {
        let path = self.path(location)?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| EngineError::local_io(path, e))? {
            let entry = entry.map_err(|e| EngineError::local_io(path, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| EngineError::local_io(entry.path(), e))?;
            let is_dir = if file_type.is_symlink() {
                entry.path().is_dir()
            } else {
                file_type.is_dir()
            };
            entries.push(DirectoryEntry::new(
                entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            ));
        }
        Ok(entries)
    }

    fn mkdir(&self, location: &Location) -> Result<()> {
        let path = self.path(location)?;
        match fs::create_dir(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
            Err(e) => Err(EngineError::local_io(path, e)),
        }
    }

    fn remove_file(&self, location: &Location) -> Result<()> {
        let path = self.path(location)?;
        fs::remove_file(path).map_err(|e| EngineError::local_io(path, e))
    }

    fn remove_dir(&self, location: &Location) -> Result<()> {
        let path = self.path(location)?;
        fs::remove_dir(path).map_err(|e| EngineError::local_io(path, e))
    }

    fn checksum(&self, location: &Location, algorithm: ChecksumAlgorithm, scope: ChecksumScope) -> Option<Checksum> {
        let path = self.path(location).ok()?;
        if !path.is_file() {
            return None;
        }
        match compute_local_checksum(path, algorithm, scope, self.chunk_size, self.partial_limit_mb) {
            Ok(checksum) => Some(checksum),
            Err(e) => {
                tracing::debug!(error = %e, "local checksum failed");
                None
            }
        }
    }
}

/// Copy a file from source to destination, preserving its modification time.
///
/// Returns the number of bytes copied.
pub fn copy_file_with_metadata(src: &Path, dst: &Path) -> Result<u64> {
    ensure_parent_dir_exists(dst)?;

    let mut src_file = fs::File::open(src).map_err(|e| EngineError::local_io(src, e))?;
    let src_mtime = src_file
        .metadata()
        .map_err(|e| EngineError::local_io(src, e))?
        .modified()
        .ok();

    let mut dst_file = fs::File::create(dst).map_err(|e| EngineError::local_io(dst, e))?;

    let bytes_copied = io::copy(&mut src_file, &mut dst_file).map_err(|e| {
        if e.kind() == io::ErrorKind::PermissionDenied {
            EngineError::local_io(dst, e)
        } else {
            EngineError::local_io(src, e)
        }
    })?;

    if let Some(mtime) = src_mtime {
        let _ = filetime::set_file_mtime(dst, filetime::FileTime::from_system_time(mtime));
    }

    Ok(bytes_copied)
}

/// Ensure the parent directory of a path exists, creating it if necessary.
pub fn ensure_parent_dir_exists(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    match fs::metadata(parent) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(EngineError::local_io(
            parent,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "Parent path exists but is not a directory",
            ),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(parent).map_err(|e| EngineError::local_io(parent, e))
        }
        Err(e) => Err(EngineError::local_io(parent, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn local_fs() -> LocalFs {
        LocalFs::new(&ComparePolicy::default())
    }

    #[test]
    fn test_list_sorted_with_parent_marker() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::create_dir(temp_dir.path().join("sub")).expect("Failed to create subdir");
        fs::write(temp_dir.path().join("b.txt"), b"b").expect("Failed to write b");
        fs::write(temp_dir.path().join("A.txt"), b"a").expect("Failed to write a");

        let entries = local_fs().list(&Location::local(temp_dir.path()));
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["..", "sub", "A.txt", "b.txt"]);
        assert!(entries[1].is_dir);
        assert!(!entries[2].is_dir);
    }

    #[test]
    fn test_list_root_has_no_parent_marker() {
        let fs_ops = local_fs();
        let root = Location::local("/");
        assert!(fs_ops.is_root(&root));
        assert!(fs_ops.list(&root).iter().all(|e| !e.is_parent()));
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let entries = local_fs().list(&Location::local(temp_dir.path().join("missing")));
        assert!(entries.is_empty());
    }

    #[test]
    fn test_mkdir_is_idempotent() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let fs_ops = local_fs();
        let dir = Location::local(temp_dir.path().join("new"));
        fs_ops.mkdir(&dir).expect("first mkdir");
        fs_ops.mkdir(&dir).expect("second mkdir");
        assert!(fs_ops.is_dir(&dir));
    }

    #[test]
    fn test_join_and_parent() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let fs_ops = local_fs();
        let base = Location::local(temp_dir.path());
        let child = fs_ops.join(&base, "child").expect("join");
        assert_eq!(child.local_path(), Some(temp_dir.path().join("child").as_path()));
        assert_eq!(fs_ops.parent(&child).expect("parent"), base);

        let root = Location::local("/");
        assert_eq!(fs_ops.parent(&root).expect("parent"), root);
    }

    #[test]
    fn test_wrong_side_is_rejected() {
        let fs_ops = local_fs();
        let remote = Location::remote("/srv");
        assert!(matches!(fs_ops.join(&remote, "x"), Err(EngineError::WrongSide { .. })));
        assert!(!fs_ops.exists(&remote));
        assert!(fs_ops.checksum(&remote, ChecksumAlgorithm::Md5, ChecksumScope::Full).is_none());
    }

    #[test]
    fn test_size_and_checksum() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("hello.txt");
        fs::write(&path, b"hello").expect("Failed to write file");
        let fs_ops = local_fs();
        let loc = Location::local(&path);

        assert_eq!(fs_ops.size(&loc), Some(5));
        let cs = fs_ops
            .checksum(&loc, ChecksumAlgorithm::Md5, ChecksumScope::Full)
            .expect("checksum");
        assert_eq!(cs.hex(), "5d41402abc4b2a76b9719d911017c592");

        let missing = Location::local(temp_dir.path().join("nope"));
        assert!(fs_ops.checksum(&missing, ChecksumAlgorithm::Md5, ChecksumScope::Full).is_none());
        assert_eq!(fs_ops.size(&missing), None);
    }

    #[test]
    fn test_remove_tree() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = temp_dir.path().join("tree");
        fs::create_dir_all(root.join("a/b/c")).expect("Failed to create dirs");
        fs::write(root.join("top.txt"), b"1").expect("write");
        fs::write(root.join("a/mid.txt"), b"2").expect("write");
        fs::write(root.join("a/b/c/deep.txt"), b"3").expect("write");

        let fs_ops = local_fs();
        fs_ops.remove_tree(&Location::local(&root)).expect("remove tree");
        assert!(!root.exists());
    }

    #[test]
    fn test_remove_tree_on_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("single.txt");
        fs::write(&path, b"x").expect("write");
        local_fs().remove_tree(&Location::local(&path)).expect("remove");
        assert!(!path.exists());
    }

    #[test]
    fn test_copy_file_with_metadata() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src_file = temp_dir.path().join("source.txt");
        let dst_file = temp_dir.path().join("nested").join("dest.txt");

        let mut file = fs::File::create(&src_file).expect("Failed to create source");
        file.write_all(b"test content").expect("Failed to write source");
        drop(file);

        let bytes = copy_file_with_metadata(&src_file, &dst_file).expect("Failed to copy");
        assert_eq!(bytes, 12);
        assert_eq!(fs::read_to_string(&dst_file).expect("read"), "test content");

        let src_mtime = fs::metadata(&src_file).and_then(|m| m.modified()).expect("mtime");
        let dst_mtime = fs::metadata(&dst_file).and_then(|m| m.modified()).expect("mtime");
        assert_eq!(src_mtime, dst_mtime);
    }

    #[test]
    fn test_ensure_parent_dir_exists() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("subdir").join("file.txt");
        ensure_parent_dir_exists(&path).expect("Failed to create parent");
        assert!(path.parent().unwrap().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_linked_directory_is_followed_for_listing_not_removal() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let outside = temp_dir.path().join("outside");
        let tree = temp_dir.path().join("tree");
        fs::create_dir(&outside).expect("mkdir");
        fs::create_dir(&tree).expect("mkdir");
        fs::write(outside.join("keep.txt"), b"keep").expect("write");
        std::os::unix::fs::symlink(&outside, tree.join("linked")).expect("symlink");

        let fs_ops = local_fs();
        let linked = Location::local(tree.join("linked"));
        assert!(fs_ops.is_dir(&linked));
        assert!(fs_ops.is_symlink(&linked));
        let entries = fs_ops.entries(&Location::local(&tree)).expect("entries");
        assert_eq!(entries, vec![DirectoryEntry::new("linked", true)]);

        fs_ops.remove_tree(&Location::local(&tree)).expect("remove tree");
        assert!(!tree.exists());
        assert!(outside.join("keep.txt").exists());
    }
}
