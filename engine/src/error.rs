//! Error types for the sync engine.
//!
//! `EngineError` covers every failure an adapter, the checksum engine or the
//! remote session can report. Only a missing root source and a failed
//! connection are fatal to an operation; everything else is recorded on the
//! affected `SyncItem` and the walk continues.

use std::io;
use std::path::PathBuf;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Path does not exist on the side it was looked up on
    #[error("Not found: {location}")]
    NotFound { location: String },

    /// A remote shell command exited non-zero
    #[error("Remote command failed with exit code {exit_code}: {command}")]
    RemoteCommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// Byte transfer of a single file failed
    #[error("Transfer failed: {from} -> {to}: {message}")]
    TransferFailed {
        from: String,
        to: String,
        message: String,
    },

    /// Local filesystem error (permissions, disk full, ...)
    #[error("Local I/O error on {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// SFTP-layer error for a remote path
    #[error("Remote I/O error on {path}: {message}")]
    RemoteIo { path: String, message: String },

    /// The SSH channel itself failed
    #[error("Session error: {message}")]
    Session { message: String },

    /// Session establishment failed
    #[error("Could not connect to {host}:{port}: {message}")]
    Connection {
        host: String,
        port: u16,
        message: String,
    },

    /// A location was handed to the adapter of the other side
    #[error("{location} is not a {expected} location")]
    WrongSide { location: String, expected: String },

    /// Recursive removal left entries behind
    #[error("Removal of {path} incomplete: {failures} entries could not be removed")]
    RemovalIncomplete { path: String, failures: usize },

    #[error("Invalid path: {path} ({reason})")]
    InvalidPath { path: String, reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl EngineError {
    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::LocalIo { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    pub(crate) fn local_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn remote_io(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::RemoteIo {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl From<ssh2::Error> for EngineError {
    fn from(err: ssh2::Error) -> Self {
        EngineError::Session {
            message: err.to_string(),
        }
    }
}
