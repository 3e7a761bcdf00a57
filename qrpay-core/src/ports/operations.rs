//! Operations console boundary
//!
//! The host-level console (repository sync, database dumps, service restarts,
//! log tailing) lives outside this crate. This port describes what such a
//! console offers so callers can compose it next to QR issuance. Nothing here
//! has access to gateway session state.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::result::Result;

/// Captured output of a host command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// One entry of the deployed repository's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub hash: String,
    pub author: String,
    pub date: String,
    pub message: String,
}

/// Location of a finished database dump, ready for download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupHandle {
    pub path: PathBuf,
    pub file_name: String,
}

/// Per-service result of a restart request
pub type RestartReport = BTreeMap<String, CommandOutcome>;

/// Whether every service in a restart report came back up
pub fn all_restarted(report: &RestartReport) -> bool {
    report.values().all(|outcome| outcome.success)
}

/// Host operations exposed to the dashboard
pub trait OperationsConsole: Send + Sync {
    /// Sync the deployed checkout with its upstream branch
    fn sync_repository(&self) -> Result<CommandOutcome>;

    /// Most recent commits of the deployed checkout
    fn commit_history(&self, limit: usize) -> Result<Vec<CommitSummary>>;

    /// Dump the database and return where the dump landed
    fn backup_database(&self) -> Result<BackupHandle>;

    /// Restart the named services
    fn restart_services(&self, services: &[String]) -> Result<RestartReport>;

    /// Stream log lines for one service until the sink returns `false`
    fn stream_logs(&self, service: &str, sink: &mut dyn FnMut(&str) -> bool) -> Result<()>;
}
