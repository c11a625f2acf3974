use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::snapshot::layout::parse_snapshot_name;
use crate::types::{SnapshotKind, SnapshotState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub name: String,
    pub path: PathBuf,
    pub state: SnapshotState,
}

/// A FULL snapshot and the incrementals hard-linked against it, kept in one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainGroup {
    pub name: String,
    pub path: PathBuf,
    /// Sorted by name, oldest first.
    pub snapshots: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultHistory {
    groups: Vec<ChainGroup>,
}

impl SnapshotEntry {
    pub fn is_complete(&self) -> bool {
        self.state == SnapshotState::Complete
    }
}

impl ChainGroup {
    pub fn complete(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.snapshots.iter().filter(|s| s.is_complete())
    }

    pub fn complete_count(&self) -> usize {
        self.complete().count()
    }

    pub fn has_complete(&self) -> bool {
        self.complete().next().is_some()
    }

    pub fn latest_complete(&self) -> Option<&SnapshotEntry> {
        self.complete().last()
    }

    /// The first committed snapshot of a group is its FULL; later ones are incremental.
    pub fn kind_of(&self, entry: &SnapshotEntry) -> Option<SnapshotKind> {
        if !entry.is_complete() {
            return None;
        }
        match self.complete().next() {
            Some(first) if first.name == entry.name => Some(SnapshotKind::Full),
            Some(_) => Some(SnapshotKind::Incremental),
            None => None,
        }
    }
}

impl VaultHistory {
    pub fn new(mut groups: Vec<ChainGroup>) -> Self {
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        for group in &mut groups {
            group.snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Self { groups }
    }

    /// Reads the vault directory. A vault that does not exist yet has no history.
    pub fn scan(vault_root: &Path) -> Result<Self> {
        let mut groups = Vec::new();
        for (name, path) in timestamped_dirs(vault_root)? {
            if parse_snapshot_name(&name).map(|(_, state)| state) != Some(SnapshotState::Complete) {
                debug!(path = %path.display(), "skip non-group entry");
                continue;
            }
            let mut snapshots = Vec::new();
            for (snap_name, snap_path) in timestamped_dirs(&path)? {
                let Some((_, state)) = parse_snapshot_name(&snap_name) else {
                    continue;
                };
                snapshots.push(SnapshotEntry {
                    name: snap_name,
                    path: snap_path,
                    state,
                });
            }
            groups.push(ChainGroup {
                name,
                path,
                snapshots,
            });
        }
        Ok(Self::new(groups))
    }

    pub fn groups(&self) -> &[ChainGroup] {
        &self.groups
    }

    pub fn newest_group(&self) -> Option<&ChainGroup> {
        self.groups.last()
    }

    /// Most recent committed snapshot across every chain, with the chain holding it.
    pub fn latest_complete(&self) -> Option<(&ChainGroup, &SnapshotEntry)> {
        self.groups
            .iter()
            .filter_map(|group| group.latest_complete().map(|entry| (group, entry)))
            .max_by(|a, b| a.1.name.cmp(&b.1.name))
    }

    pub fn provisional(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.groups
            .iter()
            .flat_map(|group| group.snapshots.iter())
            .filter(|entry| !entry.is_complete())
    }
}

// Real directories only; symlinks and files are never part of the history.
fn timestamped_dirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let file_type = entry.file_type()?;
        if !file_type.is_dir() {
            continue;
        }
        out.push((name, entry.path()));
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn mkdirs(root: &Path, paths: &[&str]) {
        for p in paths {
            fs::create_dir_all(root.join(p)).expect("mkdir");
        }
    }

    #[test]
    fn missing_vault_has_no_history() {
        let dir = TempDir::new().expect("tempdir");
        let history = VaultHistory::scan(&dir.path().join("absent")).expect("scan");
        assert!(history.groups().is_empty());
        assert!(history.latest_complete().is_none());
    }

    #[test]
    fn scan_groups_chains_and_ignores_foreign_entries() {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path();
        mkdirs(
            root,
            &[
                "2024-01-01-000000/2024-01-01-000000",
                "2024-01-01-000000/2024-01-02-000000",
                "2024-01-01-000000/2024-01-03-000000.inProgress",
                "2024-01-04-000000/2024-01-04-000000.inProgress",
                "notes",
            ],
        );
        fs::write(root.join(".snapvault.lock"), "1").unwrap();
        fs::write(root.join("2024-01-01-000000/2024-01-02-000000.log"), "x").unwrap();
        symlink(root.join("2024-01-01-000000"), root.join("2099-01-01-000000")).unwrap();

        let history = VaultHistory::scan(root).expect("scan");
        let names: Vec<_> = history.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["2024-01-01-000000", "2024-01-04-000000"]);

        let first = &history.groups()[0];
        assert_eq!(first.snapshots.len(), 3);
        assert_eq!(first.complete_count(), 2);
        assert_eq!(first.kind_of(&first.snapshots[0]), Some(SnapshotKind::Full));
        assert_eq!(first.kind_of(&first.snapshots[1]), Some(SnapshotKind::Incremental));
        assert_eq!(first.kind_of(&first.snapshots[2]), None);

        let newest = history.newest_group().unwrap();
        assert!(!newest.has_complete());

        let (group, latest) = history.latest_complete().unwrap();
        assert_eq!(group.name, "2024-01-01-000000");
        assert_eq!(latest.name, "2024-01-02-000000");
        assert_eq!(history.provisional().count(), 2);
    }
}
