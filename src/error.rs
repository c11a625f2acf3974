use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapvaultError {
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Config(ConfigError),
    #[error("{0}")]
    Guard(GuardError),
    #[error("rsync failed with exit code {code}; snapshot left provisional at {}", snapshot.display())]
    Sync { code: i32, snapshot: PathBuf },
    #[error("snapshot {} already exists; refusing to overwrite", .0.display())]
    NameCollision(PathBuf),
    #[error("vault {} is already being backed up (pid {pid})", path.display())]
    Locked { path: PathBuf, pid: u32 },
    #[error("{0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parse config: {0}")]
    Parse(String),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("source and destination are on the same volume ({0}); use --allow-same-volume to override")]
    SameVolume(String),
    #[error("cannot verify that source and destination are on different volumes: {0}")]
    Unverifiable(String),
    #[error("destination filesystem {0} cannot hold hard links; use --allow-unsupported-fs to override")]
    UnsupportedFilesystem(String),
}

pub type Result<T> = std::result::Result<T, SnapvaultError>;

impl SnapvaultError {
    pub fn message(msg: impl Into<String>) -> Self {
        SnapvaultError::Message(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        SnapvaultError::Config(ConfigError::Invalid(msg.into()))
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            SnapvaultError::Sync { code, .. } if (1..=255).contains(code) => *code,
            SnapvaultError::Locked { .. } => 3,
            _ => 1,
        }
    }
}

impl From<ConfigError> for SnapvaultError {
    fn from(err: ConfigError) -> Self {
        SnapvaultError::Config(err)
    }
}

impl From<GuardError> for SnapvaultError {
    fn from(err: GuardError) -> Self {
        SnapvaultError::Guard(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_failure_propagates_collaborator_code() {
        let err = SnapvaultError::Sync {
            code: 23,
            snapshot: PathBuf::from("/backups/x.inProgress"),
        };
        assert_eq!(err.exit_code(), 23);
    }

    #[test]
    fn out_of_range_sync_code_maps_to_one() {
        let err = SnapvaultError::Sync {
            code: -1,
            snapshot: PathBuf::from("/backups/x.inProgress"),
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(SnapvaultError::invalid("bad").exit_code(), 1);
        assert!(GuardError::SameVolume("dev 1".into())
            .to_string()
            .contains("same volume"));
    }
}
