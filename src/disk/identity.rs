use std::fmt;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{GuardError, Result};
use crate::mount::inspect::mount_for_path;

/// Opaque identifier of the volume backing a path (`st_dev`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolumeId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Volume {
    Known(VolumeId),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeCheck {
    Distinct,
    Same,
    /// At least one side could not be resolved.
    Unverifiable,
}

/// How the same-volume guard treats its inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardPolicy {
    pub allow_same_volume: bool,
    pub strict: bool,
}

impl VolumeId {
    pub fn new(dev: u64) -> Self {
        VolumeId(dev)
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev {}", self.0)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Volume::Known(id) => id.fmt(f),
            Volume::Unknown => f.write_str("unknown"),
        }
    }
}

/// Never fails: anything that cannot be stat'ed resolves to `Volume::Unknown`.
pub fn resolve(path: &Path) -> Volume {
    match std::fs::metadata(path) {
        Ok(meta) => Volume::Known(VolumeId::new(meta.dev())),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "volume unresolved");
            Volume::Unknown
        }
    }
}

pub fn compare(source: Volume, destination: Volume) -> VolumeCheck {
    match (source, destination) {
        (Volume::Known(a), Volume::Known(b)) if a == b => VolumeCheck::Same,
        (Volume::Known(_), Volume::Known(_)) => VolumeCheck::Distinct,
        _ => VolumeCheck::Unverifiable,
    }
}

fn describe(path: &Path, volume: Volume) -> String {
    match mount_for_path(path) {
        Ok(Some(entry)) => format!(
            "{} on {} ({}, {})",
            path.display(),
            entry.mountpoint.display(),
            entry.device,
            volume
        ),
        _ => format!("{} ({})", path.display(), volume),
    }
}

/// Aborts when source and destination live on the same volume.
pub fn guard_distinct_volumes(source: &Path, destination: &Path, policy: GuardPolicy) -> Result<VolumeCheck> {
    let source_volume = resolve(source);
    let destination_volume = resolve(destination);
    let check = compare(source_volume, destination_volume);
    debug!(
        source = %source_volume,
        destination = %destination_volume,
        ?check,
        "volume check"
    );
    match check {
        VolumeCheck::Distinct => {}
        VolumeCheck::Same if policy.allow_same_volume => {
            warn!("source and destination share a volume; continuing (--allow-same-volume)");
        }
        VolumeCheck::Same => {
            return Err(GuardError::SameVolume(describe(destination, destination_volume)).into());
        }
        VolumeCheck::Unverifiable if policy.strict && !policy.allow_same_volume => {
            return Err(GuardError::Unverifiable(format!(
                "source {}, destination {}",
                source_volume, destination_volume
            ))
            .into());
        }
        VolumeCheck::Unverifiable => {
            warn!(
                "cannot verify volume separation (source {}, destination {}); continuing",
                source_volume, destination_volume
            );
        }
    }
    Ok(check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SnapvaultError;
    use tempfile::TempDir;

    #[test]
    fn missing_path_is_unknown() {
        let dir = TempDir::new().expect("tempdir");
        assert_eq!(resolve(&dir.path().join("nope")), Volume::Unknown);
        assert!(matches!(resolve(dir.path()), Volume::Known(_)));
    }

    #[test]
    fn unknown_never_compares_equal() {
        let id = Volume::Known(VolumeId::new(42));
        assert_eq!(compare(id, id), VolumeCheck::Same);
        assert_eq!(compare(id, Volume::Known(VolumeId::new(7))), VolumeCheck::Distinct);
        assert_eq!(compare(Volume::Unknown, Volume::Unknown), VolumeCheck::Unverifiable);
        assert_eq!(compare(id, Volume::Unknown), VolumeCheck::Unverifiable);
    }

    #[test]
    fn same_volume_is_refused_without_override() {
        let dir = TempDir::new().expect("tempdir");
        let source = dir.path().join("src");
        let dest = dir.path().join("dst");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::create_dir_all(&dest).unwrap();

        let err = guard_distinct_volumes(&source, &dest, GuardPolicy::default()).unwrap_err();
        assert!(matches!(err, SnapvaultError::Guard(GuardError::SameVolume(_))));

        let policy = GuardPolicy {
            allow_same_volume: true,
            strict: false,
        };
        assert_eq!(guard_distinct_volumes(&source, &dest, policy).unwrap(), VolumeCheck::Same);
    }

    #[test]
    fn unverifiable_proceeds_unless_strict() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("missing");
        let check = guard_distinct_volumes(&missing, dir.path(), GuardPolicy::default()).unwrap();
        assert_eq!(check, VolumeCheck::Unverifiable);

        let strict = GuardPolicy {
            allow_same_volume: false,
            strict: true,
        };
        let err = guard_distinct_volumes(&missing, dir.path(), strict).unwrap_err();
        assert!(matches!(err, SnapvaultError::Guard(GuardError::Unverifiable(_))));
    }
}
