//! Configuration.
//!
//! `SyncConfig` is the whole configuration surface: connection settings,
//! initial paths and the comparison tunables. It loads from a JSON file with
//! every key optional. `ComparePolicy` is the subset the sync and diff
//! engines consult.

use crate::checksums::{ChecksumAlgorithm, MB};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_PARTIAL_MB: u64 = 5;
pub const DEFAULT_LARGE_FILE_MB: u64 = 10;
pub const DEFAULT_CHUNK_SIZE: usize = 65536;

/// Remote host and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    /// Private key file; used when no password is set
    pub identity_file: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            user: String::new(),
            password: None,
            identity_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    pub remote: RemoteConfig,
    pub initial_local_path: String,
    pub initial_remote_path: String,
    /// Prefix length of a partial checksum, in MiB
    pub partial_mb: u64,
    /// Files larger than this (MiB) are compared before transfer
    pub large_file_mb: u64,
    /// "md5", "sha1", "sha256" or "blake3"
    pub algorithm: String,
    /// Read size for local checksums, in bytes
    pub chunk_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            initial_local_path: ".".to_string(),
            initial_remote_path: "/".to_string(),
            partial_mb: DEFAULT_PARTIAL_MB,
            large_file_mb: DEFAULT_LARGE_FILE_MB,
            algorithm: ChecksumAlgorithm::Md5.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SyncConfig {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| EngineError::local_io(path, e))?;
        serde_json::from_str(&content).map_err(|e| EngineError::Config {
            message: format!("{}: {}", path.display(), e),
        })
    }

    pub fn algorithm(&self) -> Result<ChecksumAlgorithm> {
        ChecksumAlgorithm::from_str(&self.algorithm).ok_or_else(|| EngineError::Config {
            message: format!(
                "unknown algorithm '{}'; expected md5, sha1, sha256 or blake3",
                self.algorithm
            ),
        })
    }

    /// Check the values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.remote.host.trim().is_empty() {
            return Err(EngineError::Config {
                message: "remote host is not set".to_string(),
            });
        }
        if self.chunk_size == 0 {
            return Err(EngineError::Config {
                message: "chunkSize must be greater than 0".to_string(),
            });
        }
        if self.partial_mb == 0 {
            return Err(EngineError::Config {
                message: "partialMb must be greater than 0".to_string(),
            });
        }
        self.algorithm()?;
        Ok(())
    }

    pub fn compare_policy(&self) -> Result<ComparePolicy> {
        Ok(ComparePolicy {
            algorithm: self.algorithm()?,
            partial_limit_mb: self.partial_mb,
            large_file_threshold_mb: self.large_file_mb,
            chunk_size: self.chunk_size,
        })
    }
}

/// Comparison tunables used by copy and diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparePolicy {
    pub algorithm: ChecksumAlgorithm,
    pub partial_limit_mb: u64,
    pub large_file_threshold_mb: u64,
    pub chunk_size: usize,
}

impl ComparePolicy {
    pub fn partial_limit_bytes(&self) -> u64 {
        self.partial_limit_mb.saturating_mul(MB)
    }

    pub fn large_file_threshold_bytes(&self) -> u64 {
        self.large_file_threshold_mb.saturating_mul(MB)
    }
}

impl Default for ComparePolicy {
    fn default() -> Self {
        Self {
            algorithm: ChecksumAlgorithm::Md5,
            partial_limit_mb: DEFAULT_PARTIAL_MB,
            large_file_threshold_mb: DEFAULT_LARGE_FILE_MB,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}
