pub mod load;
pub mod model;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::backup::sync::SyncOptions;
use crate::config::model::FileConfig;
use crate::disk::fs_type::FsType;
use crate::disk::identity::GuardPolicy;
use crate::error::{Result, SnapvaultError};
use crate::snapshot::decision::{DecisionPolicy, DEFAULT_CADENCE};
use crate::snapshot::layout::{sanitize_vault_name, VaultLayout, DEFAULT_PREFIX};
use crate::snapshot::prune::DEFAULT_KEEP;
use crate::types::{Priority, RunMode};
use crate::util::paths::{is_safe_name, path_has_parent_dir};

/// Values taken from the command line; `None` falls back to the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub vault: Option<String>,
    pub exclude_file: Option<PathBuf>,
    pub fs_type: Option<String>,
    pub priority: Option<String>,
    pub bwlimit: Option<u32>,
    pub cadence: Option<usize>,
    pub keep: Option<usize>,
    pub force_full: bool,
    pub allow_same_volume: bool,
    pub strict_volume_check: bool,
    pub allow_unsupported_fs: bool,
    pub prune_only: bool,
    pub prune_after: bool,
    pub rsync_extra: Vec<String>,
    pub run_mode: RunMode,
}

/// Validated settings for one invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Absent only in prune-only runs.
    pub source: Option<PathBuf>,
    pub destination: PathBuf,
    pub layout: VaultLayout,
    pub decision: DecisionPolicy,
    pub keep: usize,
    pub guard: GuardPolicy,
    pub fs_type: Option<FsType>,
    pub allow_unsupported_fs: bool,
    pub prune_only: bool,
    pub prune_after: bool,
    pub sync: SyncOptions,
    pub run_mode: RunMode,
}

fn require_dir(label: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(SnapvaultError::invalid(format!("{} path is empty", label)));
    }
    if path_has_parent_dir(path) {
        return Err(SnapvaultError::invalid(format!(
            "{} path {} must not contain ..",
            label,
            path.display()
        )));
    }
    if !path.is_dir() {
        return Err(SnapvaultError::invalid(format!(
            "{} {} is not an existing directory",
            label,
            path.display()
        )));
    }
    Ok(())
}

// Every derived path, --link-dest included, must be absolute.
fn absolute_dir(label: &str, path: &Path) -> Result<PathBuf> {
    require_dir(label, path)?;
    path.canonicalize().map_err(|e| {
        SnapvaultError::invalid(format!("{} {}: {}", label, path.display(), e))
    })
}

fn default_vault_name() -> Result<String> {
    let host = hostname::get()
        .map_err(|e| SnapvaultError::invalid(format!("no vault given and hostname unavailable: {}", e)))?;
    Ok(host.to_string_lossy().to_string())
}

pub fn build_run_config(file: FileConfig, cli: Overrides) -> Result<RunConfig> {
    let destination = cli
        .destination
        .or(file.destination)
        .ok_or_else(|| SnapvaultError::invalid("destination is required (--destination)"))?;
    let destination = absolute_dir("destination", &destination)?;

    let source = match cli.source.or(file.source) {
        Some(path) => Some(absolute_dir("source", &path)?),
        None if !cli.prune_only => {
            return Err(SnapvaultError::invalid("source is required (--source)"));
        }
        None => None,
    };

    let raw_vault = match cli.vault.or(file.vault) {
        Some(vault) => vault,
        None => default_vault_name()?,
    };
    let vault = sanitize_vault_name(&raw_vault)?;
    if vault != raw_vault {
        debug!(raw = %raw_vault, vault = %vault, "vault name sanitized");
    }

    let prefix = file.prefix.unwrap_or_else(|| DEFAULT_PREFIX.to_string());
    if !is_safe_name(&prefix) {
        return Err(SnapvaultError::invalid(format!(
            "prefix {} must be a single name of letters, digits, '.', '-', '_'",
            prefix
        )));
    }

    let cadence = cli.cadence.or(file.cadence).unwrap_or(DEFAULT_CADENCE);
    if cadence == 0 {
        return Err(SnapvaultError::invalid("cadence must be at least 1"));
    }
    let keep = cli.keep.or(file.keep).unwrap_or(DEFAULT_KEEP);
    if keep == 0 {
        return Err(SnapvaultError::invalid("keep count must be at least 1"));
    }

    let exclude_file = cli.exclude_file.or(file.exclude_file);
    if let Some(path) = &exclude_file {
        if !path.is_file() {
            return Err(SnapvaultError::invalid(format!(
                "exclude file {} does not exist",
                path.display()
            )));
        }
    }

    let priority = match cli.priority.or(file.priority) {
        Some(value) => Priority::parse(&value).map_err(SnapvaultError::invalid)?,
        None => Priority::default(),
    };
    let fs_type = cli.fs_type.map(|value| FsType::from_str(&value)).or(file.fs_type);
    let bwlimit = cli.bwlimit.or(file.bwlimit).filter(|limit| *limit > 0);

    let mut extra_args = file.rsync;
    extra_args.extend(cli.rsync_extra);

    Ok(RunConfig {
        layout: VaultLayout::new(&destination, &prefix, &vault),
        source,
        destination,
        decision: DecisionPolicy {
            cadence,
            force_full: cli.force_full,
        },
        keep,
        guard: GuardPolicy {
            allow_same_volume: cli.allow_same_volume,
            strict: cli.strict_volume_check || file.strict_volume_check.unwrap_or(false),
        },
        fs_type,
        allow_unsupported_fs: cli.allow_unsupported_fs,
        prune_only: cli.prune_only,
        prune_after: cli.prune_after,
        sync: SyncOptions {
            exclude_file,
            bwlimit,
            priority,
            safe_links: cli.run_mode.safe_mode,
            capabilities: Default::default(),
            extra_args,
        },
        run_mode: cli.run_mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn dirs() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let source = dir.path().join("src");
        let dest = dir.path().join("dst");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&dest).unwrap();
        (dir, source, dest)
    }

    fn overrides(source: &Path, dest: &Path) -> Overrides {
        Overrides {
            source: Some(source.to_path_buf()),
            destination: Some(dest.to_path_buf()),
            vault: Some("my host!".to_string()),
            ..Overrides::default()
        }
    }

    #[test]
    fn defaults_apply() {
        let (_dir, source, dest) = dirs();
        let cfg = build_run_config(FileConfig::default(), overrides(&source, &dest)).expect("config");
        assert_eq!(cfg.layout.name(), "myhost");
        let dest = dest.canonicalize().unwrap();
        assert_eq!(cfg.layout.root(), dest.join("Backups.backupdb").join("myhost"));
        assert_eq!(cfg.decision.cadence, 7);
        assert_eq!(cfg.keep, DEFAULT_KEEP);
        assert_eq!(cfg.sync.priority, Priority::Idle);
        assert!(!cfg.guard.strict);
    }

    #[test]
    fn cli_overrides_file() {
        let (_dir, source, dest) = dirs();
        let file = FileConfig {
            cadence: Some(3),
            keep: Some(9),
            priority: Some("fast".to_string()),
            rsync: vec!["--one-file-system".to_string()],
            strict_volume_check: Some(true),
            ..FileConfig::default()
        };
        let mut cli = overrides(&source, &dest);
        cli.keep = Some(2);
        cli.rsync_extra = vec!["--sparse".to_string()];
        let cfg = build_run_config(file, cli).expect("config");
        assert_eq!(cfg.decision.cadence, 3);
        assert_eq!(cfg.keep, 2);
        assert_eq!(cfg.sync.priority, Priority::Fast);
        assert_eq!(cfg.sync.extra_args, vec!["--one-file-system", "--sparse"]);
        assert!(cfg.guard.strict);
    }

    #[test]
    fn invalid_inputs_are_config_errors() {
        let (dir, source, dest) = dirs();

        let mut cli = overrides(&source, &dest);
        cli.vault = Some("///".to_string());
        assert!(matches!(
            build_run_config(FileConfig::default(), cli),
            Err(SnapvaultError::Config(_))
        ));

        let cli = overrides(&dir.path().join("missing"), &dest);
        assert!(build_run_config(FileConfig::default(), cli).is_err());

        let mut cli = overrides(&source, &dest);
        cli.cadence = Some(0);
        assert!(build_run_config(FileConfig::default(), cli).is_err());

        let mut cli = overrides(&source, &dest);
        cli.priority = Some("ludicrous".to_string());
        assert!(build_run_config(FileConfig::default(), cli).is_err());

        let mut cli = overrides(&source, &dest);
        cli.exclude_file = Some(dir.path().join("nope.txt"));
        assert!(build_run_config(FileConfig::default(), cli).is_err());
    }

    #[test]
    fn relative_paths_are_made_absolute() {
        let dir = tempfile::Builder::new()
            .prefix("snapvault-rel")
            .tempdir_in(".")
            .expect("tempdir");
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("dst")).unwrap();
        let relative = PathBuf::from(dir.path().file_name().unwrap());
        assert!(relative.is_relative());

        let cfg = build_run_config(
            FileConfig::default(),
            overrides(&relative.join("src"), &relative.join("dst")),
        )
        .expect("config");
        assert!(cfg.destination.is_absolute());
        assert!(cfg.source.as_deref().is_some_and(Path::is_absolute));
        assert!(cfg.layout.root().is_absolute());
    }

    #[test]
    fn prune_only_does_not_need_source() {
        let (_dir, _source, dest) = dirs();
        let cli = Overrides {
            destination: Some(dest.clone()),
            vault: Some("host".to_string()),
            prune_only: true,
            ..Overrides::default()
        };
        let cfg = build_run_config(FileConfig::default(), cli).expect("config");
        assert!(cfg.source.is_none());

        let cli = Overrides {
            destination: Some(dest),
            vault: Some("host".to_string()),
            ..Overrides::default()
        };
        assert!(build_run_config(FileConfig::default(), cli).is_err());
    }
}
