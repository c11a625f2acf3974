//! Decides whether the next snapshot is a FULL copy that opens a new chain or an
//! INCREMENTAL one hard-linked against the latest committed snapshot.
//!
//! Provisional snapshots never take part: they are not link references and do
//! not count toward the cadence.

use std::fmt;
use std::path::PathBuf;

use tracing::warn;

use crate::snapshot::history::VaultHistory;
use crate::types::SnapshotKind;

pub const DEFAULT_CADENCE: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionPolicy {
    /// A chain holding this many committed snapshots is closed and the next run is FULL.
    pub cadence: usize,
    pub force_full: bool,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            cadence: DEFAULT_CADENCE,
            force_full: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainTarget {
    New,
    Existing { name: String, path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionReason {
    Forced,
    NoHistory,
    CadenceReached { count: usize },
    ReferenceMissing { reference: PathBuf },
    ChainContinues { count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub kind: SnapshotKind,
    pub chain: ChainTarget,
    pub link_reference: Option<PathBuf>,
    pub reason: DecisionReason,
}

impl Decision {
    fn full(reason: DecisionReason) -> Self {
        Self {
            kind: SnapshotKind::Full,
            chain: ChainTarget::New,
            link_reference: None,
            reason,
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::Forced => f.write_str("full backup forced"),
            DecisionReason::NoHistory => f.write_str("no complete snapshot yet"),
            DecisionReason::CadenceReached { count } => {
                write!(f, "chain holds {} snapshots, starting a new one", count)
            }
            DecisionReason::ReferenceMissing { reference } => {
                write!(f, "link reference {} vanished", reference.display())
            }
            DecisionReason::ChainContinues { count } => {
                write!(f, "chain holds {} snapshots", count)
            }
        }
    }
}

pub fn decide(history: &VaultHistory, policy: &DecisionPolicy) -> Decision {
    if policy.force_full {
        return Decision::full(DecisionReason::Forced);
    }
    let Some((group, latest)) = history.latest_complete() else {
        return Decision::full(DecisionReason::NoHistory);
    };

    let count = group.complete_count();
    if count >= policy.cadence {
        return Decision::full(DecisionReason::CadenceReached { count });
    }

    // History may be stale by the time the copy starts; re-check the reference.
    if !latest.path.is_dir() {
        warn!(
            reference = %latest.path.display(),
            "link reference is missing; falling back to a full snapshot"
        );
        return Decision::full(DecisionReason::ReferenceMissing {
            reference: latest.path.clone(),
        });
    }

    Decision {
        kind: SnapshotKind::Incremental,
        chain: ChainTarget::Existing {
            name: group.name.clone(),
            path: group.path.clone(),
        },
        link_reference: Some(latest.path.clone()),
        reason: DecisionReason::ChainContinues { count },
    }
}
