//! One-level directory comparison.
//!
//! Only regular entries take part; subdirectories and ".." are ignored. A
//! name present on both sides is `identical` only if both digests could be
//! read and agree, otherwise it is `differing`.

use crate::checksums::{ChecksumAlgorithm, ChecksumScope};
use crate::error::Result;
use crate::fs_ops::{wrong_side, Endpoints, Filesystem};
use crate::model::{DiffResult, Location, Side};
use crate::remote::RemoteSession;
use std::collections::BTreeSet;

/// Compare the files directly inside two directories, on any pair of sides.
///
/// An unreadable or missing directory contributes no names.
pub fn diff<S: RemoteSession>(
    endpoints: &Endpoints<S>,
    source_dir: &Location,
    dest_dir: &Location,
    algorithm: ChecksumAlgorithm,
    scope: ChecksumScope,
) -> DiffResult {
    let src_fs = endpoints.fs(source_dir.side());
    let dst_fs = endpoints.fs(dest_dir.side());

    let src_names = file_names(src_fs, source_dir);
    let dst_names = file_names(dst_fs, dest_dir);

    let mut result = DiffResult {
        only_source: src_names.difference(&dst_names).cloned().collect(),
        only_dest: dst_names.difference(&src_names).cloned().collect(),
        ..DiffResult::default()
    };

    for name in src_names.intersection(&dst_names) {
        let ours = src_fs
            .join(source_dir, name)
            .ok()
            .and_then(|loc| src_fs.checksum(&loc, algorithm, scope));
        let theirs = dst_fs
            .join(dest_dir, name)
            .ok()
            .and_then(|loc| dst_fs.checksum(&loc, algorithm, scope));

        match (ours, theirs) {
            (Some(a), Some(b)) if a.matches(&b) => {
                result.identical.insert(name.clone());
            }
            _ => {
                result.differing.insert(name.clone());
            }
        }
    }

    tracing::info!(
        source = %source_dir.describe(),
        destination = %dest_dir.describe(),
        %algorithm,
        %scope,
        only_source = result.only_source.len(),
        only_dest = result.only_dest.len(),
        differing = result.differing.len(),
        identical = result.identical.len(),
        "diff finished"
    );
    result
}

/// Compare a local directory (as source) with a remote one.
pub fn diff_top_level<S: RemoteSession>(
    endpoints: &Endpoints<S>,
    local_dir: &Location,
    remote_dir: &Location,
    algorithm: ChecksumAlgorithm,
    scope: ChecksumScope,
) -> Result<DiffResult> {
    if local_dir.side() != Side::Local {
        return Err(wrong_side(local_dir, Side::Local));
    }
    if remote_dir.side() != Side::Remote {
        return Err(wrong_side(remote_dir, Side::Remote));
    }
    Ok(diff(endpoints, local_dir, remote_dir, algorithm, scope))
}

fn file_names(fs: &dyn Filesystem, dir: &Location) -> BTreeSet<String> {
    fs.list(dir)
        .into_iter()
        .filter(|entry| !entry.is_dir && !entry.is_parent())
        .map(|entry| entry.name)
        .collect()
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use crate::config::ComparePolicy;
    use crate::error::EngineError;
    use crate::testing::{pattern, remote_location, LoopbackSession};
    use std::fs;
    use std::path::Path;

    fn endpoints() -> Endpoints<LoopbackSession> {
        Endpoints::new(LoopbackSession::new(), &ComparePolicy::default())
    }

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    fn setup(root: &Path, files: &[(&str, &str)]) {
        fs::create_dir_all(root).expect("mkdir");
        for (name, content) in files {
            fs::write(root.join(name), content).expect("write");
        }
    }

    #[test]
    fn test_diff_top_level_classifies_names() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let local = temp_dir.path().join("local");
        let remote = temp_dir.path().join("remote");
        setup(&local, &[("x.txt", "x"), ("y.txt", "y-local"), ("z.txt", "z")]);
        setup(&remote, &[("y.txt", "y-remote"), ("z.txt", "z")]);

        for scope in [ChecksumScope::Full, ChecksumScope::Partial] {
            let result = diff_top_level(
                &endpoints(),
                &Location::local(&local),
                &remote_location(&remote),
                ChecksumAlgorithm::Md5,
                scope,
            )
            .expect("diff");

            assert_eq!(names(&result.only_source), vec!["x.txt"]);
            assert!(result.only_dest.is_empty());
            assert_eq!(names(&result.differing), vec!["y.txt"]);
            assert_eq!(names(&result.identical), vec!["z.txt"]);
        }
    }

    #[test]
    fn test_diff_sets_are_disjoint_and_total() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let cases: Vec<(Vec<(&str, &str)>, Vec<(&str, &str)>)> = vec![
            (vec![], vec![]),
            (vec![("a", "1")], vec![]),
            (vec![], vec![("b", "2")]),
            (vec![("a", "1"), ("b", "2")], vec![("a", "1"), ("b", "3"), ("c", "4")]),
            (vec![("A", "1"), ("a", "1")], vec![("a", "2"), ("B", "")]),
            (vec![("e", "")], vec![("e", "")]),
        ];

        for (i, (left, right)) in cases.iter().enumerate() {
            let local = temp_dir.path().join(format!("l{}", i));
            let remote = temp_dir.path().join(format!("r{}", i));
            setup(&local, left);
            setup(&remote, right);
            // Subdirectories never appear in any set.
            fs::create_dir(local.join("subdir")).expect("mkdir");
            fs::create_dir(remote.join("subdir")).expect("mkdir");

            let result = diff(
                &endpoints(),
                &Location::local(&local),
                &remote_location(&remote),
                ChecksumAlgorithm::Sha256,
                ChecksumScope::Full,
            );

            let all: BTreeSet<String> = left
                .iter()
                .chain(right.iter())
                .map(|(name, _)| name.to_string())
                .collect();
            assert_eq!(result.total(), all.len(), "case {}", i);
            for name in &all {
                let memberships = [
                    result.only_source.contains(name),
                    result.only_dest.contains(name),
                    result.differing.contains(name),
                    result.identical.contains(name),
                ];
                assert_eq!(memberships.iter().filter(|m| **m).count(), 1, "case {} name {}", i, name);
            }
            assert!(!result.contains("subdir"));
        }
    }

    #[test]
    fn test_partial_scope_only_sees_prefix() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let left = temp_dir.path().join("left");
        let right = temp_dir.path().join("right");
        let data = pattern(6 * 1024 * 1024, 4);
        let mut changed = data.clone();
        let last = changed.len() - 1;
        changed[last] ^= 0x10;
        fs::create_dir(&left).expect("mkdir");
        fs::create_dir(&right).expect("mkdir");
        fs::write(left.join("big.bin"), &data).expect("write");
        fs::write(right.join("big.bin"), &changed).expect("write");

        let ends = endpoints();
        let partial = diff(
            &ends,
            &remote_location(&left),
            &Location::local(&right),
            ChecksumAlgorithm::Md5,
            ChecksumScope::Partial,
        );
        assert_eq!(names(&partial.identical), vec!["big.bin"]);

        let full = diff(
            &ends,
            &remote_location(&left),
            &Location::local(&right),
            ChecksumAlgorithm::Md5,
            ChecksumScope::Full,
        );
        assert_eq!(names(&full.differing), vec!["big.bin"]);
    }

    #[test]
    fn test_missing_directory_contributes_nothing() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let local = temp_dir.path().join("local");
        setup(&local, &[("only.txt", "1")]);

        let result = diff_top_level(
            &endpoints(),
            &Location::local(&local),
            &remote_location(&temp_dir.path().join("absent")),
            ChecksumAlgorithm::Md5,
            ChecksumScope::Full,
        )
        .expect("diff");
        assert_eq!(names(&result.only_source), vec!["only.txt"]);
        assert_eq!(result.total(), 1);
    }

    #[test]
    fn test_diff_top_level_rejects_swapped_sides() {
        let result = diff_top_level(
            &endpoints(),
            &Location::remote("/srv"),
            &Location::local("/tmp"),
            ChecksumAlgorithm::Md5,
            ChecksumScope::Full,
        );
        assert!(matches!(result, Err(EngineError::WrongSide { .. })));
    }
}
