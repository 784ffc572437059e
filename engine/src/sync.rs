//! Smart copy, move and delete.
//!
//! One walk serves every pair of sides: it talks to both ends through
//! `Filesystem` and lets `Endpoints::transfer` pick the byte mover. Files at
//! or below the large-file threshold are always transferred. Larger files are
//! compared by a prefix digest first and a whole-file digest second, and are
//! skipped only when both agree.
//!
//! Per-item failures never abort a walk. They are recorded on the item,
//! written to the diagnostic log as `Error:` lines and logged at `warn`.

use crate::checksums::ChecksumScope;
use crate::config::ComparePolicy;
use crate::diagnostics::DiagnosticLog;
use crate::error::{EngineError, Result};
use crate::fs_ops::{transfer_verb, Endpoints, Filesystem};
use crate::model::{
    ItemState, Location, Mode, SyncDecision, SyncItem, SyncReport, TransferReason,
};
use crate::remote::RemoteSession;
use std::time::SystemTime;

/// Decide whether `source` has to be transferred onto `destination`.
///
/// Any size or digest that cannot be obtained resolves to a transfer.
pub fn decide<S: RemoteSession>(
    endpoints: &Endpoints<S>,
    policy: &ComparePolicy,
    source: &Location,
    destination: &Location,
) -> SyncDecision {
    let src_fs = endpoints.fs(source.side());
    let dst_fs = endpoints.fs(destination.side());

    if !dst_fs.exists(destination) {
        return SyncDecision::Transfer(TransferReason::DestinationMissing);
    }

    let size = match src_fs.size(source) {
        Some(size) => size,
        None => return SyncDecision::Transfer(TransferReason::Inconclusive),
    };
    if size <= policy.large_file_threshold_bytes() {
        return SyncDecision::Transfer(TransferReason::SmallFile);
    }

    let compare = |scope: ChecksumScope| {
        let ours = src_fs.checksum(source, policy.algorithm, scope);
        let theirs = dst_fs.checksum(destination, policy.algorithm, scope);
        match (ours, theirs) {
            (Some(a), Some(b)) => Some(a.matches(&b)),
            _ => None,
        }
    };

    match compare(ChecksumScope::Partial) {
        None => return SyncDecision::Transfer(TransferReason::Inconclusive),
        Some(false) => return SyncDecision::Transfer(TransferReason::PartialMismatch),
        Some(true) => {}
    }
    match compare(ChecksumScope::Full) {
        None => SyncDecision::Transfer(TransferReason::Inconclusive),
        Some(false) => SyncDecision::Transfer(TransferReason::FullMismatch),
        Some(true) => SyncDecision::Skip,
    }
}

/// Copy a file or directory tree from `source` to `destination`.
///
/// `destination` is the exact target path, not the directory to copy into.
///
/// # Errors
/// Fails only if `source` does not exist or the destination lies inside the
/// source tree. Everything else is reported per item.
pub fn copy<S: RemoteSession>(
    endpoints: &Endpoints<S>,
    policy: &ComparePolicy,
    log: &mut DiagnosticLog,
    source: &Location,
    destination: &Location,
) -> Result<SyncReport> {
    run(endpoints, policy, log, Mode::Copy, source, destination)
}

/// Copy, then remove the source.
///
/// The source is removed only if the copy finished with no failed item;
/// otherwise a `KEEP` line is logged and both copies stay in place.
pub fn move_entry<S: RemoteSession>(
    endpoints: &Endpoints<S>,
    policy: &ComparePolicy,
    log: &mut DiagnosticLog,
    source: &Location,
    destination: &Location,
) -> Result<SyncReport> {
    let mut report = run(endpoints, policy, log, Mode::Move, source, destination)?;

    if report.has_failures() {
        log.push(format!(
            "KEEP {}: {} item(s) failed",
            source,
            report.failed_count()
        ));
        tracing::warn!(
            source = %source.describe(),
            failed = report.failed_count(),
            "copy incomplete, source kept"
        );
        return Ok(report);
    }

    let src_fs = endpoints.fs(source.side());
    let is_tree = src_fs.is_dir(source) && !src_fs.is_symlink(source);
    log.push(format!(
        "RM {}{} {}",
        source.side().tag(),
        if is_tree { " DIR" } else { "" },
        source
    ));
    match src_fs.remove_tree(source) {
        Ok(()) => {
            report.source_removed = true;
            tracing::info!(source = %source.describe(), "source removed");
        }
        Err(e) => {
            log.push(format!("Error: {}", e));
            tracing::warn!(source = %source.describe(), error = %e, "could not remove source");
        }
    }

    Ok(report)
}

/// Remove a file, or a directory and everything beneath it.
///
/// Confirmation is the caller's job.
pub fn delete_entry<S: RemoteSession>(
    endpoints: &Endpoints<S>,
    log: &mut DiagnosticLog,
    location: &Location,
) -> Result<()> {
    let fs = endpoints.fs(location.side());
    if !fs.exists(location) {
        let err = EngineError::NotFound {
            location: location.describe(),
        };
        log.push(format!("Error: {}", err));
        return Err(err);
    }

    log.push(format!("DEL {} {}", location.side().tag(), location));
    let result = fs.remove_tree(location);
    match &result {
        Ok(()) => tracing::info!(location = %location.describe(), "deleted"),
        Err(e) => {
            log.push(format!("Error: {}", e));
            tracing::warn!(location = %location.describe(), error = %e, "delete failed");
        }
    }
    result
}

fn run<S: RemoteSession>(
    endpoints: &Endpoints<S>,
    policy: &ComparePolicy,
    log: &mut DiagnosticLog,
    mode: Mode,
    source: &Location,
    destination: &Location,
) -> Result<SyncReport> {
    let src_fs = endpoints.fs(source.side());
    let dst_fs = endpoints.fs(destination.side());

    if !src_fs.exists(source) {
        let err = EngineError::NotFound {
            location: source.describe(),
        };
        log.push(format!("Error: {}", err));
        return Err(err);
    }
    if is_within(destination, source) {
        let err = EngineError::InvalidPath {
            path: destination.describe(),
            reason: format!("destination lies inside {}", source.describe()),
        };
        log.push(format!("Error: {}", err));
        return Err(err);
    }

    tracing::info!(
        %mode,
        source = %source.describe(),
        destination = %destination.describe(),
        "sync started"
    );
    let mut report = SyncReport::new(mode, source.clone(), destination.clone());

    // Pre-order: children are pushed in reverse so they pop in listing order.
    // Each entry carries the link targets followed on its way down.
    let mut stack = vec![(source.clone(), destination.clone(), Vec::new())];
    while let Some((src, dst, followed)) = stack.pop() {
        if src_fs.is_dir(&src) {
            let followed = match follow_link(src_fs, &src, followed) {
                Ok(followed) => followed,
                Err(e) => {
                    let mut item = SyncItem::new(src, dst, true);
                    record_failure(log, &mut item, &e);
                    report.items.push(item);
                    continue;
                }
            };
            let (item, children) = sync_dir(src_fs, dst_fs, log, src, dst);
            report.items.push(item);
            stack.extend(
                children
                    .into_iter()
                    .rev()
                    .map(|(child_src, child_dst)| (child_src, child_dst, followed.clone())),
            );
        } else {
            let item = sync_file(endpoints, policy, log, src, dst);
            report.bytes_transferred += item.bytes_transferred;
            report.items.push(item);
        }
    }

    report.finished_at = Some(SystemTime::now());
    tracing::info!(
        id = %report.id,
        transferred = report.transferred_count(),
        skipped = report.skipped_count(),
        failed = report.failed_count(),
        bytes = report.bytes_transferred,
        "sync finished"
    );
    Ok(report)
}

fn sync_dir(
    src_fs: &dyn Filesystem,
    dst_fs: &dyn Filesystem,
    log: &mut DiagnosticLog,
    src: Location,
    dst: Location,
) -> (SyncItem, Vec<(Location, Location)>) {
    let mut item = SyncItem::new(src.clone(), dst.clone(), true);

    log.push(format!("MKDIR {}", dst));
    if let Err(e) = dst_fs.mkdir(&dst) {
        record_failure(log, &mut item, &e);
        return (item, Vec::new());
    }
    tracing::info!(directory = %dst.describe(), "directory ready");

    let entries = match src_fs.entries(&src) {
        Ok(entries) => entries,
        Err(e) => {
            record_failure(log, &mut item, &e);
            return (item, Vec::new());
        }
    };

    let mut children = Vec::with_capacity(entries.len());
    for entry in entries {
        match (src_fs.join(&src, &entry.name), dst_fs.join(&dst, &entry.name)) {
            (Ok(child_src), Ok(child_dst)) => children.push((child_src, child_dst)),
            (Err(e), _) | (_, Err(e)) => record_failure(log, &mut item, &e),
        }
    }
    (item, children)
}

fn sync_file<S: RemoteSession>(
    endpoints: &Endpoints<S>,
    policy: &ComparePolicy,
    log: &mut DiagnosticLog,
    src: Location,
    dst: Location,
) -> SyncItem {
    let mut item = SyncItem::new(src, dst, false);
    item.size = endpoints.fs(item.source.side()).size(&item.source);

    let decision = decide(endpoints, policy, &item.source, &item.destination);
    item.decision = Some(decision);

    match decision {
        SyncDecision::Skip => {
            log.push(format!("SKIP identical: {} -> {}", item.source, item.destination));
            tracing::info!(source = %item.source.describe(), "identical, skipped");
            item.state = ItemState::Skipped;
        }
        SyncDecision::Transfer(reason) => {
            log.push(format!(
                "{} {} -> {}",
                transfer_verb(&item.source, &item.destination),
                item.source,
                item.destination
            ));
            match endpoints.transfer(&item.source, &item.destination) {
                Ok(bytes) => {
                    tracing::info!(
                        source = %item.source.describe(),
                        destination = %item.destination.describe(),
                        ?reason,
                        bytes,
                        "transferred"
                    );
                    item.bytes_transferred = bytes;
                    item.state = ItemState::Transferred;
                }
                Err(e) => record_failure(log, &mut item, &e),
            }
        }
    }
    item
}

/// Extend `followed` when `dir` is a symbolic link, refusing a link whose
/// target is one of its own ancestors or was already followed on this path.
fn follow_link(
    fs: &dyn Filesystem,
    dir: &Location,
    mut followed: Vec<Location>,
) -> Result<Vec<Location>> {
    if !fs.is_symlink(dir) {
        return Ok(followed);
    }
    let target = fs.resolve(dir)?;
    let parent = fs.resolve(&fs.parent(dir)?)?;
    if followed.contains(&target) || is_within(&parent, &target) {
        return Err(EngineError::InvalidPath {
            path: dir.describe(),
            reason: format!("symbolic link loops back to {}", target.describe()),
        });
    }
    followed.push(target);
    Ok(followed)
}

fn record_failure(log: &mut DiagnosticLog, item: &mut SyncItem, err: &EngineError) {
    log.push(format!("Error: {}", err));
    tracing::warn!(source = %item.source.describe(), error = %err, "item failed");
    item.fail(err);
}

/// True if `inner` is `outer` or lies beneath it on the same side.
fn is_within(inner: &Location, outer: &Location) -> bool {
    match (inner, outer) {
        (Location::Local(inner), Location::Local(outer)) => inner.starts_with(outer),
        (Location::Remote(inner), Location::Remote(outer)) => {
            inner == outer
                || outer == "/"
                || inner
                    .strip_prefix(outer.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        }
        _ => false,
    }
}
