use std::fs;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::disk::fs_type::{detect_fs_type, FsType};
use crate::disk::identity::guard_distinct_volumes;
use crate::error::{GuardError, Result, SnapvaultError};
use crate::snapshot::decision::{decide, Decision};
use crate::snapshot::history::VaultHistory;
use crate::snapshot::materialize::{materialize, CommitResult, SnapshotPlan};
use crate::snapshot::prune::{prune, PruneOutcome};
use crate::util::lock;

pub mod rsync;
pub mod sync;

use sync::{SyncOptions, SyncTool};

#[derive(Debug, Clone)]
pub struct BackupReport {
    pub decision: Decision,
    pub plan: SnapshotPlan,
    /// `None` in dry-run mode.
    pub commit: Option<CommitResult>,
    /// The copy command a dry run would have executed.
    pub command: Option<String>,
    pub prune: Option<PruneOutcome>,
}

fn destination_fs_type(config: &RunConfig) -> Option<FsType> {
    if let Some(fs_type) = &config.fs_type {
        return Some(fs_type.clone());
    }
    match detect_fs_type(&config.destination) {
        Ok(found) => found,
        Err(err) => {
            debug!(error = %err, "filesystem type detection failed");
            None
        }
    }
}

fn sync_options(config: &RunConfig) -> Result<SyncOptions> {
    let mut options = config.sync.clone();
    if let Some(fs_type) = destination_fs_type(config) {
        if fs_type.is_rejected() && !config.allow_unsupported_fs {
            return Err(GuardError::UnsupportedFilesystem(fs_type.to_string()).into());
        }
        debug!(fs_type = %fs_type, "destination filesystem");
        options.capabilities = fs_type.capabilities();
    }
    Ok(options)
}

/// One backup invocation: guards, decision, copy and commit, then optional pruning.
pub fn run_backup<T: SyncTool + ?Sized>(
    config: &RunConfig,
    tool: &T,
    now: DateTime<Utc>,
) -> Result<BackupReport> {
    let source = config
        .source
        .as_deref()
        .ok_or_else(|| SnapvaultError::invalid("source is required"))?;
    guard_distinct_volumes(source, &config.destination, config.guard)?;
    let options = sync_options(config)?;
    let root = config.layout.root();

    if config.run_mode.dry_run {
        let history = VaultHistory::scan(root)?;
        let decision = decide(&history, &config.decision);
        let plan = SnapshotPlan::new(&config.layout, &decision, now);
        let command = tool.describe(&plan.sync_request(source, &options));
        let pruned = if config.prune_after {
            Some(prune(root, config.keep, true)?)
        } else {
            None
        };
        return Ok(BackupReport {
            decision,
            plan,
            commit: None,
            command: Some(command),
            prune: pruned,
        });
    }

    fs::create_dir_all(root)
        .map_err(|e| SnapvaultError::message(format!("create {}: {}", root.display(), e)))?;
    let _lock = lock::acquire(&config.layout.lock_path())?;

    let history = VaultHistory::scan(root)?;
    let leftovers = history.provisional().count();
    if leftovers > 0 {
        warn!(count = leftovers, "provisional snapshots from earlier runs are ignored");
    }
    let decision = decide(&history, &config.decision);
    info!(
        vault = config.layout.name(),
        kind = %decision.kind,
        reason = %decision.reason,
        "snapshot decided"
    );

    let plan = SnapshotPlan::new(&config.layout, &decision, now);
    let commit = materialize(&plan, source, &options, tool)?;

    let pruned = if config.prune_after {
        match prune(root, config.keep, false) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                warn!(error = %err, "pruning failed after a committed snapshot");
                None
            }
        }
    } else {
        None
    };

    Ok(BackupReport {
        decision,
        plan,
        commit: Some(commit),
        command: None,
        prune: pruned,
    })
}

/// Retention only; no snapshot is decided or written.
pub fn run_prune(config: &RunConfig) -> Result<PruneOutcome> {
    let root = config.layout.root();
    let dry_run = config.run_mode.dry_run;
    let _lock = if !dry_run && root.is_dir() {
        Some(lock::acquire(&config.layout.lock_path())?)
    } else {
        None
    };
    prune(root, config.keep, dry_run)
}
