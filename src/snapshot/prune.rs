//! Chain-aware retention: whole chain groups are kept or deleted, never single
//! snapshots, so an incremental never outlives the FULL it links against.
//!
//! `keep` counts chain groups, including a group left holding only a failed
//! provisional FULL. Such a group can only sit between complete groups when a
//! later FULL succeeded, so the newest kept group always holds a complete
//! snapshot, but fewer than `keep` kept groups may be restorable.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Result, SnapvaultError};
use crate::snapshot::history::VaultHistory;

pub const DEFAULT_KEEP: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PruneAction {
    Deleted,
    WouldDelete,
    /// Deletion stopped here; newer candidates were left in place.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneEvent {
    pub path: PathBuf,
    pub action: PruneAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PruneOutcome {
    WithinRetention { groups: usize },
    /// The newest group has no committed snapshot; nothing was deleted.
    Skipped { newest: PathBuf },
    Pruned(Vec<PruneEvent>),
}

impl PruneOutcome {
    pub fn failure(&self) -> Option<&PruneEvent> {
        match self {
            PruneOutcome::Pruned(events) => events
                .iter()
                .find(|e| matches!(e.action, PruneAction::Failed(_))),
            _ => None,
        }
    }
}

/// Groups that a prune with `keep` would delete, oldest first.
pub fn select_candidates(history: &VaultHistory, keep: usize) -> Result<PruneOutcome> {
    if keep == 0 {
        return Err(SnapvaultError::invalid("keep count must be at least 1"));
    }
    let groups = history.groups();
    if groups.len() <= keep {
        return Ok(PruneOutcome::WithinRetention {
            groups: groups.len(),
        });
    }
    if let Some(newest) = history.newest_group() {
        if !newest.has_complete() {
            return Ok(PruneOutcome::Skipped {
                newest: newest.path.clone(),
            });
        }
    }
    let events = groups[..groups.len() - keep]
        .iter()
        .map(|group| PruneEvent {
            path: group.path.clone(),
            action: PruneAction::WouldDelete,
        })
        .collect();
    Ok(PruneOutcome::Pruned(events))
}

pub fn prune(vault_root: &Path, keep: usize, dry_run: bool) -> Result<PruneOutcome> {
    let history = VaultHistory::scan(vault_root)?;
    let selection = select_candidates(&history, keep)?;
    let candidates = match selection {
        PruneOutcome::Pruned(events) => events,
        PruneOutcome::Skipped { newest } => {
            warn!(
                newest = %newest.display(),
                "newest chain has no complete snapshot; pruning skipped"
            );
            return Ok(PruneOutcome::Skipped { newest });
        }
        other => {
            debug!(vault = %vault_root.display(), "nothing to prune");
            return Ok(other);
        }
    };
    if dry_run {
        return Ok(PruneOutcome::Pruned(candidates));
    }

    Ok(PruneOutcome::Pruned(delete_candidates(candidates, |path| {
        fs::remove_dir_all(path)
    })))
}

// Stops at the first failure; groups deleted before it are still reported.
fn delete_candidates<F>(candidates: Vec<PruneEvent>, mut remove: F) -> Vec<PruneEvent>
where
    F: FnMut(&Path) -> io::Result<()>,
{
    let mut events = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match remove(&candidate.path) {
            Ok(()) => {
                info!(chain = %candidate.path.display(), "deleted chain");
                events.push(PruneEvent {
                    path: candidate.path,
                    action: PruneAction::Deleted,
                });
            }
            Err(err) => {
                warn!(chain = %candidate.path.display(), error = %err, "chain deletion failed");
                events.push(PruneEvent {
                    path: candidate.path,
                    action: PruneAction::Failed(err.to_string()),
                });
                break;
            }
        }
    }
    events
}
