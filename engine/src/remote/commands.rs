//! Shell command builders and output parsers for the remote host.
//!
//! Every path is single-quoted for a POSIX shell; an embedded `'` becomes
//! `'\''`.

use crate::checksums::{ChecksumAlgorithm, ChecksumScope};

pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Exits 0 iff `path` is a regular file.
pub fn file_test(path: &str) -> String {
    format!("test -f {}", shell_quote(path))
}

pub fn file_size(path: &str) -> String {
    format!("stat -c %s {}", shell_quote(path))
}

/// Digest command. The partial form hashes only the first `partial_mb` MiB,
/// read with `dd` so the file never leaves the host.
pub fn digest(path: &str, algorithm: ChecksumAlgorithm, scope: ChecksumScope, partial_mb: u64) -> String {
    let tool = algorithm.remote_tool();
    match scope {
        ChecksumScope::Full => format!("{} {}", tool, shell_quote(path)),
        ChecksumScope::Partial => format!(
            "dd if={} bs=1M count={} 2>/dev/null | {}",
            shell_quote(path),
            partial_mb,
            tool
        ),
    }
}

/// Same-host copy preserving mode and timestamps.
pub fn copy(from: &str, to: &str) -> String {
    format!("cp -p {} {}", shell_quote(from), shell_quote(to))
}

/// First whitespace-delimited token of `<hex-digest> <filename>` output.
pub fn parse_digest(output: &str) -> Option<String> {
    let token = output.split_whitespace().next()?;
    if token.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(token.to_ascii_lowercase())
    } else {
        None
    }
}

/// A size is valid only if the trimmed output is purely decimal digits.
pub fn parse_size(output: &str) -> Option<u64> {
    let trimmed = output.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}
