use std::path::PathBuf;

use serde::Deserialize;

use crate::disk::fs_type::FsType;

/// On-disk YAML configuration. Every field is optional; command-line flags win.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(default)]
    pub destination: Option<PathBuf>,
    #[serde(default)]
    pub vault: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub cadence: Option<usize>,
    #[serde(default)]
    pub keep: Option<usize>,
    #[serde(default, rename = "excludeFile")]
    pub exclude_file: Option<PathBuf>,
    #[serde(default, rename = "fsType")]
    pub fs_type: Option<FsType>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub bwlimit: Option<u32>,
    #[serde(default, rename = "strictVolumeCheck")]
    pub strict_volume_check: Option<bool>,
    #[serde(default)]
    pub rsync: Vec<String>,
}
