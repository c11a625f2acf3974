use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::error::Result;
use crate::mount::inspect::mount_for_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsType {
    Ext2,
    Ext3,
    Ext4,
    Xfs,
    Jfs,
    Btrfs,
    Zfs,
    F2fs,
    Apfs,
    Hfsplus,
    Other(String),
}

/// rsync preservation flags a destination filesystem can honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FsCapabilities {
    pub xattrs: bool,
    pub acls: bool,
    pub crtimes: bool,
}

impl FsType {
    pub fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ext2" => FsType::Ext2,
            "ext3" => FsType::Ext3,
            "ext4" => FsType::Ext4,
            "xfs" => FsType::Xfs,
            "jfs" => FsType::Jfs,
            "btrfs" => FsType::Btrfs,
            "zfs" | "zfs_member" => FsType::Zfs,
            "f2fs" => FsType::F2fs,
            "apfs" => FsType::Apfs,
            "hfsplus" | "hfs+" => FsType::Hfsplus,
            other => FsType::Other(other.to_string()),
        }
    }

    /// Filesystems that cannot hold hard links, so snapshots would not deduplicate.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            FsType::Other(name)
                if name == "vfat"
                    || name == "fat"
                    || name == "fat32"
                    || name == "exfat"
                    || name == "ntfs"
                    || name == "msdos"
                    || name == "iso9660"
                    || name == "udf"
        )
    }

    pub fn capabilities(&self) -> FsCapabilities {
        match self {
            FsType::Ext2
            | FsType::Ext3
            | FsType::Ext4
            | FsType::Xfs
            | FsType::Jfs
            | FsType::Btrfs
            | FsType::Zfs
            | FsType::F2fs => FsCapabilities {
                xattrs: true,
                acls: true,
                crtimes: false,
            },
            FsType::Apfs | FsType::Hfsplus => FsCapabilities {
                xattrs: true,
                acls: false,
                crtimes: true,
            },
            FsType::Other(_) => FsCapabilities::default(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FsType::Ext2 => "ext2",
            FsType::Ext3 => "ext3",
            FsType::Ext4 => "ext4",
            FsType::Xfs => "xfs",
            FsType::Jfs => "jfs",
            FsType::Btrfs => "btrfs",
            FsType::Zfs => "zfs",
            FsType::F2fs => "f2fs",
            FsType::Apfs => "apfs",
            FsType::Hfsplus => "hfsplus",
            FsType::Other(name) => name,
        }
    }
}

impl fmt::Display for FsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FsType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(FsType::from_str(&value))
    }
}

/// Filesystem type of the mount holding `path`, if the mount table knows it.
pub fn detect_fs_type(path: &Path) -> Result<Option<FsType>> {
    Ok(mount_for_path(path)?.map(|entry| FsType::from_str(&entry.fs_type)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_by_type() {
        let ext4 = FsType::from_str("ext4").capabilities();
        assert!(ext4.xattrs && ext4.acls && !ext4.crtimes);
        let apfs = FsType::from_str("APFS").capabilities();
        assert!(apfs.crtimes);
        assert_eq!(FsType::from_str("nfs4").capabilities(), FsCapabilities::default());
    }

    #[test]
    fn rejects_filesystems_without_hard_links() {
        assert!(FsType::from_str("vfat").is_rejected());
        assert!(FsType::from_str("exfat").is_rejected());
        assert!(!FsType::from_str("xfs").is_rejected());
        assert!(!FsType::from_str("nfs4").is_rejected());
    }
}
