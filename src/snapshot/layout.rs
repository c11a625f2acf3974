//! Snapshot naming and the on-disk hierarchy.
//!
//! ```text
//! <destination>/<prefix>/<vault>/<chain group>/<snapshot>[.inProgress]
//! ```
//!
//! Chain groups and snapshots are both named by UTC timestamps at one-second
//! resolution, so sorting names sorts them chronologically.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Result, SnapvaultError};
use crate::types::SnapshotState;

pub const DEFAULT_PREFIX: &str = "Backups.backupdb";
pub const PROVISIONAL_SUFFIX: &str = ".inProgress";
pub const TRANSCRIPT_EXTENSION: &str = "log";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// Strips everything outside `[A-Za-z0-9_-]`; an empty result is a configuration error.
pub fn sanitize_vault_name(raw: &str) -> Result<String> {
    let clean: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if clean.is_empty() {
        return Err(SnapvaultError::invalid(format!(
            "vault name {:?} is empty after removing characters outside [A-Za-z0-9_-]",
            raw
        )));
    }
    Ok(clean)
}

pub fn timestamp_name(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

pub fn snapshot_name(timestamp: DateTime<Utc>, state: SnapshotState) -> String {
    let base = timestamp_name(timestamp);
    match state {
        SnapshotState::Complete => base,
        SnapshotState::Provisional => format!("{}{}", base, PROVISIONAL_SUFFIX),
    }
}

pub fn transcript_name(snapshot: &str) -> String {
    format!("{}.{}", snapshot, TRANSCRIPT_EXTENSION)
}

/// Parses a directory name produced by [`snapshot_name`].
pub fn parse_snapshot_name(name: &str) -> Option<(NaiveDateTime, SnapshotState)> {
    let (base, state) = match name.strip_suffix(PROVISIONAL_SUFFIX) {
        Some(base) => (base, SnapshotState::Provisional),
        None => (name, SnapshotState::Complete),
    };
    // Fixed width keeps lexical and chronological order identical.
    if base.len() != 17 {
        return None;
    }
    NaiveDateTime::parse_from_str(base, TIMESTAMP_FORMAT)
        .ok()
        .map(|ts| (ts, state))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultLayout {
    root: PathBuf,
    name: String,
}

impl VaultLayout {
    pub fn new(destination: &Path, prefix: &str, vault: &str) -> Self {
        Self {
            root: destination.join(prefix).join(vault),
            name: vault.to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(".snapvault.lock")
    }

    pub fn group_path(&self, group: &str) -> PathBuf {
        self.root.join(group)
    }
}
