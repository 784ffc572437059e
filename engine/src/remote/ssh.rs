//! `RemoteSession` over SSH, backed by the `ssh2` crate.
//!
//! One TCP connection and one SFTP channel are opened at connect time and
//! reused for the life of the session. Each shell command gets its own exec
//! channel on the same connection. Nothing reconnects: once the connection
//! drops, every later call fails.

use super::{CommandOutput, RemoteEntry, RemoteSession, RemoteStat};
use crate::config::RemoteConfig;
use crate::error::{EngineError, Result};
use ssh2::{Channel, Session, Sftp};
use std::fs::File;
use std::io::{self, Read};
use std::net::TcpStream;
use std::path::Path;
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(2);

pub struct SshSession {
    session: Session,
    sftp: Sftp,
}

impl SshSession {
    /// Connect and authenticate.
    ///
    /// Authentication tries, in order: the configured password, the
    /// configured identity file, the SSH agent.
    pub fn connect(config: &RemoteConfig) -> Result<Self> {
        let fail = |message: String| EngineError::Connection {
            host: config.host.clone(),
            port: config.port,
            message,
        };

        let addr = format!("{}:{}", config.host, config.port);
        let tcp = TcpStream::connect(&addr).map_err(|e| fail(format!("TCP connect failed: {}", e)))?;
        let mut session = Session::new().map_err(|e| fail(e.to_string()))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| fail(format!("handshake failed: {}", e)))?;

        let mut auth_errs: Vec<String> = Vec::new();
        if let Some(password) = &config.password {
            if let Err(e) = session.userauth_password(&config.user, password) {
                auth_errs.push(format!("password: {}", e));
            }
        }
        if !session.authenticated() {
            if let Some(identity) = &config.identity_file {
                if let Err(e) = session.userauth_pubkey_file(&config.user, None, Path::new(identity), None) {
                    auth_errs.push(format!("key {}: {}", identity, e));
                }
            }
        }
        if !session.authenticated() {
            if let Err(e) = session.userauth_agent(&config.user) {
                auth_errs.push(format!("agent: {}", e));
            }
        }
        if !session.authenticated() {
            return Err(fail(format!("authentication failed: {}", auth_errs.join("; "))));
        }

        let sftp = session
            .sftp()
            .map_err(|e| fail(format!("could not open SFTP channel: {}", e)))?;

        tracing::info!(host = %config.host, port = config.port, user = %config.user, "connected");
        Ok(SshSession { session, sftp })
    }
}

impl RemoteSession for SshSession {
    fn execute(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = self.session.channel_session()?;
        channel.exec(command)?;

        // stdout and stderr share one flow-control window; drain them together.
        self.session.set_blocking(false);
        let drained = drain_streams(&mut channel);
        self.session.set_blocking(true);
        let (stdout, stderr) = drained.map_err(|e| EngineError::Session { message: e.to_string() })?;

        channel.wait_close()?;
        let exit_code = channel.exit_status()?;
        tracing::debug!(%command, exit_code, "remote command finished");

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
        })
    }

    fn get(&self, remote: &str, local: &Path) -> Result<u64> {
        let mut source = self
            .sftp
            .open(Path::new(remote))
            .map_err(|e| EngineError::remote_io(remote, e))?;
        let mut target = File::create(local).map_err(|e| EngineError::local_io(local, e))?;
        io::copy(&mut source, &mut target).map_err(|e| EngineError::TransferFailed {
            from: remote.to_string(),
            to: local.display().to_string(),
            message: e.to_string(),
        })
    }

    fn put(&self, local: &Path, remote: &str) -> Result<u64> {
        let mut source = File::open(local).map_err(|e| EngineError::local_io(local, e))?;
        let mut target = self
            .sftp
            .create(Path::new(remote))
            .map_err(|e| EngineError::remote_io(remote, e))?;
        io::copy(&mut source, &mut target).map_err(|e| EngineError::TransferFailed {
            from: local.display().to_string(),
            to: remote.to_string(),
            message: e.to_string(),
        })
    }

    fn stat(&self, path: &str) -> Result<RemoteStat> {
        let stat = self
            .sftp
            .stat(Path::new(path))
            .map_err(|e| EngineError::remote_io(path, e))?;
        Ok(RemoteStat {
            is_dir: stat.is_dir(),
            is_symlink: false,
            size: stat.size,
        })
    }

    fn lstat(&self, path: &str) -> Result<RemoteStat> {
        let stat = self
            .sftp
            .lstat(Path::new(path))
            .map_err(|e| EngineError::remote_io(path, e))?;
        Ok(RemoteStat {
            is_dir: stat.is_dir(),
            is_symlink: stat.file_type().is_symlink(),
            size: stat.size,
        })
    }

    fn realpath(&self, path: &str) -> Result<String> {
        let resolved = self
            .sftp
            .realpath(Path::new(path))
            .map_err(|e| EngineError::remote_io(path, e))?;
        Ok(resolved.to_string_lossy().into_owned())
    }

    fn listdir(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let entries = self
            .sftp
            .readdir(Path::new(path))
            .map_err(|e| EngineError::remote_io(path, e))?;
        Ok(entries
            .into_iter()
            .filter_map(|(entry_path, stat)| {
                let name = entry_path.file_name()?.to_string_lossy().into_owned();
                if name == "." || name == ".." {
                    return None;
                }
                // readdir reports the link itself; a link counts as a
                // directory when its target is one.
                let is_dir = if stat.file_type().is_symlink() {
                    self.sftp.stat(&entry_path).map(|s| s.is_dir()).unwrap_or(false)
                } else {
                    stat.is_dir()
                };
                Some(RemoteEntry { name, is_dir })
            })
            .collect())
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        self.sftp
            .mkdir(Path::new(path), 0o755)
            .map_err(|e| EngineError::remote_io(path, e))
    }

    fn remove(&self, path: &str) -> Result<()> {
        self.sftp
            .unlink(Path::new(path))
            .map_err(|e| EngineError::remote_io(path, e))
    }

    fn rmdir(&self, path: &str) -> Result<()> {
        self.sftp
            .rmdir(Path::new(path))
            .map_err(|e| EngineError::remote_io(path, e))
    }
}

/// Read stdout and stderr of a non-blocking channel until the remote side
/// signals end of file.
fn drain_streams(channel: &mut Channel) -> io::Result<(Vec<u8>, Vec<u8>)> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut buf = vec![0u8; 32 * 1024];
    loop {
        let got_out = read_ready(&mut channel.stream(0), &mut stdout, &mut buf)?;
        let got_err = read_ready(&mut channel.stderr(), &mut stderr, &mut buf)?;
        if channel.eof() {
            read_ready(&mut channel.stream(0), &mut stdout, &mut buf)?;
            read_ready(&mut channel.stderr(), &mut stderr, &mut buf)?;
            return Ok((stdout, stderr));
        }
        if !got_out && !got_err {
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Append whatever `reader` has ready. True if any bytes arrived.
fn read_ready(reader: &mut impl Read, sink: &mut Vec<u8>, buf: &mut [u8]) -> io::Result<bool> {
    let mut progressed = false;
    loop {
        match reader.read(buf) {
            Ok(0) => return Ok(progressed),
            Ok(n) => {
                sink.extend_from_slice(&buf[..n]);
                progressed = true;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(progressed),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        let _ = self.session.disconnect(None, "closing session", None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays a fixed sequence of read results.
    struct Scripted(VecDeque<io::Result<Vec<u8>>>);

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    fn would_block() -> io::Result<Vec<u8>> {
        Err(io::Error::from(io::ErrorKind::WouldBlock))
    }

    #[test]
    fn test_read_ready_stops_at_would_block() {
        let mut reader = Scripted(VecDeque::from(vec![
            Ok(b"abc".to_vec()),
            Ok(b"de".to_vec()),
            would_block(),
            Ok(b"later".to_vec()),
        ]));
        let mut sink = Vec::new();
        let mut buf = [0u8; 16];

        assert!(read_ready(&mut reader, &mut sink, &mut buf).expect("read"));
        assert_eq!(sink, b"abcde");
        assert!(read_ready(&mut reader, &mut sink, &mut buf).expect("read"));
        assert_eq!(sink, b"abcdelater");
        assert!(!read_ready(&mut reader, &mut sink, &mut buf).expect("read"));
    }

    #[test]
    fn test_read_ready_with_nothing_pending() {
        let mut reader = Scripted(VecDeque::from(vec![would_block()]));
        let mut sink = Vec::new();
        let mut buf = [0u8; 16];
        assert!(!read_ready(&mut reader, &mut sink, &mut buf).expect("read"));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_read_ready_propagates_real_errors() {
        let mut reader = Scripted(VecDeque::from(vec![
            Ok(b"x".to_vec()),
            Err(io::Error::from(io::ErrorKind::ConnectionReset)),
        ]));
        let mut sink = Vec::new();
        let mut buf = [0u8; 16];
        let err = read_ready(&mut reader, &mut sink, &mut buf).expect_err("reset");
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }
}
