//! Creates a snapshot directory under its provisional name, runs the copy into
//! it, and renames it to its final name only when the copy succeeded. The
//! rename is the commit point; a failed or interrupted copy stays provisional.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::backup::sync::{SyncOptions, SyncOutcome, SyncPlan, SyncRequest, SyncTool};
use crate::error::{Result, SnapvaultError};
use crate::snapshot::decision::{ChainTarget, Decision};
use crate::snapshot::layout::{snapshot_name, timestamp_name, transcript_name, VaultLayout};
use crate::types::{SnapshotKind, SnapshotState};

/// Every path one snapshot run touches, derived before anything is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPlan {
    pub kind: SnapshotKind,
    pub name: String,
    pub group: PathBuf,
    pub new_group: bool,
    pub provisional: PathBuf,
    pub committed: PathBuf,
    pub transcript: PathBuf,
    pub link_reference: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResult {
    pub snapshot: PathBuf,
    pub kind: SnapshotKind,
    pub transcript: Option<PathBuf>,
    pub outcome: SyncOutcome,
}

impl SnapshotPlan {
    pub fn new(layout: &VaultLayout, decision: &Decision, now: DateTime<Utc>) -> Self {
        let name = timestamp_name(now);
        let (group, new_group) = match &decision.chain {
            ChainTarget::New => (layout.group_path(&name), true),
            ChainTarget::Existing { path, .. } => (path.clone(), false),
        };
        Self {
            kind: decision.kind,
            provisional: group.join(snapshot_name(now, SnapshotState::Provisional)),
            committed: group.join(&name),
            transcript: group.join(transcript_name(&name)),
            link_reference: decision.link_reference.clone(),
            name,
            group,
            new_group,
        }
    }

    pub fn sync_request(&self, source: &Path, options: &SyncOptions) -> SyncRequest {
        let plan = match &self.link_reference {
            Some(reference) => SyncPlan::Incremental {
                link_reference: reference.clone(),
            },
            None => SyncPlan::Full,
        };
        SyncRequest {
            source: source.to_path_buf(),
            destination: self.provisional.clone(),
            plan,
            options: options.clone(),
        }
    }

    fn check_collision(&self) -> Result<()> {
        if self.new_group && self.group.exists() {
            return Err(SnapvaultError::NameCollision(self.group.clone()));
        }
        for path in [&self.committed, &self.provisional, &self.transcript] {
            if fs::symlink_metadata(path).is_ok() {
                return Err(SnapvaultError::NameCollision(path.clone()));
            }
        }
        Ok(())
    }
}

fn create_new_dir(path: &Path) -> Result<()> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            Err(SnapvaultError::NameCollision(path.to_path_buf()))
        }
        Err(err) => Err(SnapvaultError::message(format!(
            "create {}: {}",
            path.display(),
            err
        ))),
    }
}

pub fn materialize<T: SyncTool + ?Sized>(
    plan: &SnapshotPlan,
    source: &Path,
    options: &SyncOptions,
    tool: &T,
) -> Result<CommitResult> {
    plan.check_collision()?;
    if plan.new_group {
        create_new_dir(&plan.group)?;
    }
    create_new_dir(&plan.provisional)?;
    info!(
        snapshot = %plan.provisional.display(),
        kind = %plan.kind,
        "copy started"
    );

    let request = plan.sync_request(source, options);
    let outcome = tool.sync(&request, &plan.transcript)?;
    if !outcome.success() {
        warn!(
            code = outcome.exit_code,
            transcript = %plan.transcript.display(),
            "copy failed; snapshot left provisional"
        );
        return Err(SnapvaultError::Sync {
            code: outcome.exit_code,
            snapshot: plan.provisional.clone(),
        });
    }

    // A directory appearing under the final name meanwhile is never replaced.
    if fs::symlink_metadata(&plan.committed).is_ok() {
        return Err(SnapvaultError::NameCollision(plan.committed.clone()));
    }
    fs::rename(&plan.provisional, &plan.committed).map_err(|e| {
        SnapvaultError::message(format!(
            "commit {} -> {}: {}",
            plan.provisional.display(),
            plan.committed.display(),
            e
        ))
    })?;

    let transcript = if plan.transcript.exists() {
        let target = plan.committed.join(transcript_name(&plan.name));
        match fs::rename(&plan.transcript, &target) {
            Ok(()) => Some(target),
            Err(err) => {
                warn!(error = %err, "could not move transcript into snapshot");
                Some(plan.transcript.clone())
            }
        }
    } else {
        None
    };

    info!(
        snapshot = %plan.committed.display(),
        seconds = outcome.duration.as_secs(),
        "snapshot committed"
    );
    Ok(CommitResult {
        snapshot: plan.committed.clone(),
        kind: plan.kind,
        transcript,
        outcome,
    })
}
