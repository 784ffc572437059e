//! Checksum computation.
//!
//! This module provides:
//! - The supported digest algorithms (MD5, SHA-1, SHA-256, BLAKE3)
//! - Partial (prefix) and full checksum scopes
//! - Streaming local checksum computation
//!
//! Remote checksums are never computed here: the remote host runs the digest
//! tool itself (see `remote::commands`).

use crate::error::{EngineError, Result};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One mebibyte, the unit of every size setting.
pub const MB: u64 = 1024 * 1024;

/// Supported checksum algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Blake3,
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => write!(f, "md5"),
            Self::Sha1 => write!(f, "sha1"),
            Self::Sha256 => write!(f, "sha256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

impl ChecksumAlgorithm {
    /// Parse algorithm from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "md5" => Some(Self::Md5),
            "sha1" => Some(Self::Sha1),
            "sha256" => Some(Self::Sha256),
            "blake3" => Some(Self::Blake3),
            _ => None,
        }
    }

    /// Name of the digest tool on the remote host.
    pub fn remote_tool(&self) -> &'static str {
        match self {
            Self::Md5 => "md5sum",
            Self::Sha1 => "sha1sum",
            Self::Sha256 => "sha256sum",
            Self::Blake3 => "b3sum",
        }
    }
}

/// How much of the file a checksum covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumScope {
    /// Only the first `partial_limit_mb` MiB
    Partial,
    /// The whole file
    Full,
}

impl fmt::Display for ChecksumScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partial => write!(f, "partial"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// A computed checksum value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    algorithm: ChecksumAlgorithm,
    scope: ChecksumScope,
    hex: String,
}

impl Checksum {
    pub fn new(algorithm: ChecksumAlgorithm, scope: ChecksumScope, hex: String) -> Self {
        Checksum {
            algorithm,
            scope,
            hex,
        }
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    pub fn scope(&self) -> ChecksumScope {
        self.scope
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Same algorithm and same scope.
    pub fn comparable(&self, other: &Checksum) -> bool {
        self.algorithm == other.algorithm && self.scope == other.scope
    }

    /// Comparable and equal digests.
    pub fn matches(&self, other: &Checksum) -> bool {
        self.comparable(other) && self.hex.eq_ignore_ascii_case(&other.hex)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

/// Trait for streaming digests
pub trait ChecksumHasher {
    /// Update the hasher with new data
    fn update(&mut self, data: &[u8]);

    /// Finalize and return the lowercase hex digest
    fn finalize_hex(self: Box<Self>) -> String;
}

struct Md5Hasher {
    context: md5::Context,
}

impl ChecksumHasher for Md5Hasher {
    fn update(&mut self, data: &[u8]) {
        self.context.consume(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        format!("{:x}", self.context.compute())
    }
}

struct Sha1Hasher {
    hasher: sha1::Sha1,
}

impl ChecksumHasher for Sha1Hasher {
    fn update(&mut self, data: &[u8]) {
        use sha1::Digest;
        self.hasher.update(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        use sha1::Digest;
        format!("{:x}", self.hasher.finalize())
    }
}

struct Sha256Hasher {
    hasher: sha2::Sha256,
}

impl ChecksumHasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) {
        use sha2::Digest;
        self.hasher.update(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        use sha2::Digest;
        format!("{:x}", self.hasher.finalize())
    }
}

struct Blake3Hasher {
    hasher: blake3::Hasher,
}

impl ChecksumHasher for Blake3Hasher {
    fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}

/// Create a new hasher for the given algorithm
pub fn create_hasher(algorithm: ChecksumAlgorithm) -> Box<dyn ChecksumHasher> {
    match algorithm {
        ChecksumAlgorithm::Md5 => Box::new(Md5Hasher {
            context: md5::Context::new(),
        }),
        ChecksumAlgorithm::Sha1 => Box::new(Sha1Hasher {
            hasher: sha1::Sha1::default(),
        }),
        ChecksumAlgorithm::Sha256 => Box::new(Sha256Hasher {
            hasher: sha2::Sha256::default(),
        }),
        ChecksumAlgorithm::Blake3 => Box::new(Blake3Hasher {
            hasher: blake3::Hasher::new(),
        }),
    }
}

/// Compute the checksum of a local file.
///
/// Reads `chunk_bytes` at a time. In partial scope every read is capped at the
/// remaining budget, so the digest covers exactly the first
/// `min(len, partial_limit_mb MiB)` bytes, the same prefix a remote
/// `dd bs=1M count=N` produces.
pub fn compute_local_checksum(
    path: &Path,
    algorithm: ChecksumAlgorithm,
    scope: ChecksumScope,
    chunk_bytes: usize,
    partial_limit_mb: u64,
) -> Result<Checksum> {
    let mut file = File::open(path).map_err(|e| EngineError::local_io(path, e))?;

    let mut budget = match scope {
        ChecksumScope::Partial => Some(partial_limit_mb.saturating_mul(MB)),
        ChecksumScope::Full => None,
    };
    let mut buffer = vec![0u8; chunk_bytes.max(1)];
    let mut hasher = create_hasher(algorithm);

    loop {
        let want = match budget {
            Some(0) => break,
            Some(remaining) => buffer.len().min(usize::try_from(remaining).unwrap_or(usize::MAX)),
            None => buffer.len(),
        };
        let n = file
            .read(&mut buffer[..want])
            .map_err(|e| EngineError::local_io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        if let Some(remaining) = budget.as_mut() {
            *remaining -= n as u64;
        }
    }

    let hex = hasher.finalize_hex();
    tracing::debug!(path = %path.display(), %algorithm, %scope, digest = %hex, "local checksum");
    Ok(Checksum::new(algorithm, scope, hex))
}
