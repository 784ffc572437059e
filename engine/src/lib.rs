//! # twinsync engine
//!
//! Smart-copy synchronization between a local disk and a remote host
//! reached over SSH/SFTP.
//!
//! ## Overview
//!
//! The engine moves files and directory trees between the two sides in any
//! direction while avoiding transfers it can prove unnecessary:
//! - Files at or below the large-file threshold are always transferred
//! - Larger files are compared by a prefix digest, then a whole-file digest,
//!   and skipped only when both agree
//! - Remote digests are computed on the remote host; nothing is downloaded
//!   just to compare it
//! - Per-item failures are recorded and never abort a directory walk
//! - Every operation leaves human-readable lines in a bounded diagnostic log
//!
//! ## Basic Usage
//!
//! ```no_run
//! use std::path::Path;
//! use twinsync_engine::{Location, SshSession, SyncConfig, SyncContext};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::load(Path::new("twinsync.json"))?;
//! let session = SshSession::connect(&config.remote)?;
//! let mut context = SyncContext::from_config(session, &config)?;
//!
//! let report = context.copy(
//!     &Location::local("photos"),
//!     &Location::remote("/srv/backup/photos"),
//! )?;
//! println!("{} transferred, {} skipped", report.transferred_count(), report.skipped_count());
//!
//! for line in context.log().entries() {
//!     println!("{}", line);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Locations, listings, decisions and reports
//! - **error**: Error types and handling
//! - **config**: Configuration file and comparison policy
//! - **checksums**: Streaming digests and the local checksum engine
//! - **diagnostics**: The bounded diagnostic log
//! - **remote**: The remote session trait, its SSH implementation, and shell commands
//! - **fs_ops**: One filesystem interface over both sides
//! - **sync**: Smart copy, move and delete
//! - **diff**: One-level directory comparison
//! - **navigation**: Listing and directory changes
//! - **context**: The session object front ends drive

pub mod model;
pub mod error;
pub mod config;
pub mod checksums;
pub mod diagnostics;
pub mod remote;
pub mod fs_ops;
pub mod sync;
pub mod diff;
pub mod navigation;
pub mod context;

#[cfg(all(test, target_os = "linux"))]
mod testing;

// Re-export main types and functions
pub use model::{
    DiffResult, DirectoryEntry, ItemState, Location, Mode, Side, SyncDecision, SyncItem, SyncReport,
    TransferReason,
};
pub use error::{EngineError, Result};
pub use config::{ComparePolicy, RemoteConfig, SyncConfig};
pub use checksums::{compute_local_checksum, Checksum, ChecksumAlgorithm, ChecksumScope};
pub use diagnostics::{DiagnosticLog, CMD_LOG_MAX};
pub use remote::{RemoteSession, SshSession};
pub use fs_ops::{Endpoints, Filesystem, LocalFs, RemoteFs};
pub use context::SyncContext;
