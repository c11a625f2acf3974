use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::disk::fs_type::FsCapabilities;
use crate::error::Result;
use crate::types::Priority;

/// What the copy collaborator is asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPlan {
    Full,
    /// Unchanged files become hard links into `link_reference`.
    Incremental { link_reference: PathBuf },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub exclude_file: Option<PathBuf>,
    /// KiB per second.
    pub bwlimit: Option<u32>,
    pub priority: Priority,
    pub safe_links: bool,
    pub capabilities: FsCapabilities,
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub plan: SyncPlan,
    pub options: SyncOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub exit_code: i32,
    pub duration: Duration,
    pub transferred_bytes: Option<u64>,
    pub files_transferred: Option<u64>,
}

impl SyncOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The external tool that copies `source` into the provisional snapshot.
pub trait SyncTool {
    /// Runs the copy to completion, writing the tool's own output to `transcript`.
    fn sync(&self, request: &SyncRequest, transcript: &Path) -> Result<SyncOutcome>;

    /// Human-readable form of what [`SyncTool::sync`] would run.
    fn describe(&self, request: &SyncRequest) -> String;
}

/// Appends a trailing separator so the tool copies directory contents, not the directory.
pub fn with_trailing_separator(path: &Path) -> OsString {
    let mut out = path.as_os_str().to_os_string();
    if !path.as_os_str().to_string_lossy().ends_with('/') {
        out.push("/");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_separator_is_not_doubled() {
        assert_eq!(with_trailing_separator(Path::new("/home")), OsString::from("/home/"));
        assert_eq!(with_trailing_separator(Path::new("/home/")), OsString::from("/home/"));
        assert_eq!(with_trailing_separator(Path::new("/")), OsString::from("/"));
    }
}
