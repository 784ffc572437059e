//! Core data model for sync operations.
//!
//! This module defines the main data structures:
//! - Side and Location: which endpoint a path lives on
//! - DirectoryEntry: one row of a listing
//! - SyncDecision: the outcome of comparing a source file with its destination
//! - DiffResult: the four classified filename sets of a directory diff
//! - SyncReport / SyncItem: per-operation and per-item outcome records

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use uuid::Uuid;

/// One of the two filesystem endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Local,
    Remote,
}

impl Side {
    /// Upper-case tag used in diagnostic lines ("LOCAL" / "REMOTE").
    pub fn tag(&self) -> &'static str {
        match self {
            Side::Local => "LOCAL",
            Side::Remote => "REMOTE",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Local => write!(f, "local"),
            Side::Remote => write!(f, "remote"),
        }
    }
}

/// An absolute path on exactly one side.
///
/// Local paths follow the OS path grammar, remote paths are POSIX strings.
/// Both constructors normalize to a canonical absolute form, so two
/// locations naming the same path compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    Local(PathBuf),
    Remote(String),
}

impl Location {
    /// Local location; relative paths are resolved against the current directory.
    pub fn local(path: impl AsRef<Path>) -> Self {
        Location::Local(normalize_local(path.as_ref()))
    }

    /// Remote location; the path is interpreted as absolute.
    pub fn remote(path: impl AsRef<str>) -> Self {
        Location::Remote(normalize_remote(path.as_ref()))
    }

    pub fn side(&self) -> Side {
        match self {
            Location::Local(_) => Side::Local,
            Location::Remote(_) => Side::Remote,
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Location::Local(path) => Some(path),
            Location::Remote(_) => None,
        }
    }

    pub fn remote_path(&self) -> Option<&str> {
        match self {
            Location::Local(_) => None,
            Location::Remote(path) => Some(path),
        }
    }

    /// Last path segment, if any (the root has none).
    pub fn file_name(&self) -> Option<String> {
        match self {
            Location::Local(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            Location::Remote(path) => path
                .rsplit('/')
                .next()
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        }
    }

    /// "side:path" form, used by the CLI and in error messages.
    pub fn describe(&self) -> String {
        format!("{}:{}", self.side(), self)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Remote(path) => write!(f, "{}", path),
        }
    }
}

fn normalize_local(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn normalize_remote(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }
    format!("/{}", segments.join("/"))
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_dir: bool,
}

impl DirectoryEntry {
    pub const PARENT: &'static str = "..";

    pub fn new(name: impl Into<String>, is_dir: bool) -> Self {
        DirectoryEntry {
            name: name.into(),
            is_dir,
        }
    }

    /// The synthetic ".." entry prepended to listings below the root.
    pub fn parent() -> Self {
        DirectoryEntry::new(Self::PARENT, true)
    }

    pub fn is_parent(&self) -> bool {
        self.name == Self::PARENT
    }
}

/// Why a file is going to be transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferReason {
    /// Nothing at the destination yet
    DestinationMissing,
    /// At or below the large-file threshold; comparing is not worth it
    SmallFile,
    /// Prefix digests differ
    PartialMismatch,
    /// Prefix digests agree but whole-file digests differ
    FullMismatch,
    /// A size or digest could not be obtained; fail open to transfer
    Inconclusive,
}

/// Outcome of comparing a source file against its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// Content identical, no bytes move
    Skip,
    Transfer(TransferReason),
}

impl SyncDecision {
    pub fn is_skip(&self) -> bool {
        matches!(self, SyncDecision::Skip)
    }
}

/// Classification of one directory pair. The four sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    pub only_source: BTreeSet<String>,
    pub only_dest: BTreeSet<String>,
    pub differing: BTreeSet<String>,
    pub identical: BTreeSet<String>,
}

impl DiffResult {
    /// Number of distinct filenames classified.
    pub fn total(&self) -> usize {
        self.only_source.len() + self.only_dest.len() + self.differing.len() + self.identical.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.only_source.contains(name)
            || self.only_dest.contains(name)
            || self.differing.contains(name)
            || self.identical.contains(name)
    }
}

/// The operation a report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Copy; source remains unchanged
    Copy,
    /// Copy, then remove the source once the copy finished cleanly
    Move,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Copy => write!(f, "Copy"),
            Mode::Move => write!(f, "Move"),
        }
    }
}

/// Terminal state of one item of a sync walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Destination directory created (or already present)
    Created,
    /// File bytes transferred
    Transferred,
    /// Identical content already at the destination
    Skipped,
    /// Error recorded; the walk continued
    Failed,
}

/// One file or directory visited by a copy.
#[derive(Debug, Clone)]
pub struct SyncItem {
    pub source: Location,
    pub destination: Location,
    pub is_dir: bool,
    /// Source size in bytes, when it could be read (None for directories)
    pub size: Option<u64>,
    /// The comparison outcome (None for directories)
    pub decision: Option<SyncDecision>,
    pub state: ItemState,
    pub bytes_transferred: u64,
    /// OS error code if state is Failed and the cause was local
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
}

impl SyncItem {
    pub(crate) fn new(source: Location, destination: Location, is_dir: bool) -> Self {
        SyncItem {
            source,
            destination,
            is_dir,
            size: None,
            decision: None,
            state: ItemState::Created,
            bytes_transferred: 0,
            error_code: None,
            error_message: None,
        }
    }

    pub(crate) fn fail(&mut self, err: &crate::error::EngineError) {
        self.state = ItemState::Failed;
        self.error_code = err.raw_os_error();
        self.error_message = Some(err.to_string());
    }
}

/// Record of one copy or move operation.
#[derive(Debug)]
pub struct SyncReport {
    pub id: Uuid,
    pub mode: Mode,
    pub source: Location,
    pub destination: Location,
    /// Items in visiting order (pre-order)
    pub items: Vec<SyncItem>,
    pub bytes_transferred: u64,
    pub started_at: SystemTime,
    pub finished_at: Option<SystemTime>,
    /// Set by move once the source has been removed
    pub source_removed: bool,
}

impl SyncReport {
    pub(crate) fn new(mode: Mode, source: Location, destination: Location) -> Self {
        SyncReport {
            id: Uuid::new_v4(),
            mode,
            source,
            destination,
            items: Vec::new(),
            bytes_transferred: 0,
            started_at: SystemTime::now(),
            finished_at: None,
            source_removed: false,
        }
    }

    fn count(&self, state: ItemState) -> usize {
        self.items.iter().filter(|item| item.state == state).count()
    }

    pub fn transferred_count(&self) -> usize {
        self.count(ItemState::Transferred)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(ItemState::Skipped)
    }

    pub fn failed_count(&self) -> usize {
        self.count(ItemState::Failed)
    }

    pub fn has_failures(&self) -> bool {
        self.items.iter().any(|item| item.state == ItemState::Failed)
    }
}
