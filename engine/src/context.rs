//! Session context: the outward interface of the engine.
//!
//! `SyncContext` owns both filesystem adapters, the comparison policy and the
//! diagnostic log for one remote session. Front ends drive everything
//! through it and read the log back for display.

use crate::checksums::{ChecksumAlgorithm, ChecksumScope};
use crate::config::{ComparePolicy, SyncConfig};
use crate::diagnostics::DiagnosticLog;
use crate::error::Result;
use crate::fs_ops::Endpoints;
use crate::model::{DiffResult, DirectoryEntry, Location, SyncReport};
use crate::remote::RemoteSession;
use crate::{diff, navigation, sync};
use std::path::Path;

pub struct SyncContext<S> {
    endpoints: Endpoints<S>,
    policy: ComparePolicy,
    log: DiagnosticLog,
}

impl<S: RemoteSession> SyncContext<S> {
    pub fn new(session: S, policy: ComparePolicy) -> Self {
        SyncContext {
            endpoints: Endpoints::new(session, &policy),
            policy,
            log: DiagnosticLog::new(),
        }
    }

    /// Validate `config` and build a context from its comparison settings.
    pub fn from_config(session: S, config: &SyncConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(session, config.compare_policy()?))
    }

    pub fn policy(&self) -> &ComparePolicy {
        &self.policy
    }

    pub fn endpoints(&self) -> &Endpoints<S> {
        &self.endpoints
    }

    pub fn session(&self) -> &S {
        self.endpoints.remote.session()
    }

    pub fn list_local(&self, path: impl AsRef<Path>) -> Vec<DirectoryEntry> {
        navigation::list(&self.endpoints, &Location::local(path))
    }

    pub fn list_remote(&self, path: &str) -> Vec<DirectoryEntry> {
        navigation::list(&self.endpoints, &Location::remote(path))
    }

    pub fn change_directory(&self, current: &Location, target: &str) -> Location {
        navigation::change_directory(&self.endpoints, current, target)
    }

    pub fn copy(&mut self, source: &Location, destination: &Location) -> Result<SyncReport> {
        sync::copy(&self.endpoints, &self.policy, &mut self.log, source, destination)
    }

    pub fn move_entry(&mut self, source: &Location, destination: &Location) -> Result<SyncReport> {
        sync::move_entry(&self.endpoints, &self.policy, &mut self.log, source, destination)
    }

    pub fn delete_entry(&mut self, location: &Location) -> Result<()> {
        sync::delete_entry(&self.endpoints, &mut self.log, location)
    }

    pub fn diff_top_level(
        &self,
        local_dir: &Location,
        remote_dir: &Location,
        algorithm: ChecksumAlgorithm,
        scope: ChecksumScope,
    ) -> Result<DiffResult> {
        diff::diff_top_level(&self.endpoints, local_dir, remote_dir, algorithm, scope)
    }

    pub fn log(&self) -> &DiagnosticLog {
        &self.log
    }
}
