use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SnapvaultError};

const MOUNT_TABLE: &str = "/proc/self/mounts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mountpoint: PathBuf,
    pub fs_type: String,
    pub read_only: bool,
}

fn read_mounts() -> Result<String> {
    fs::read_to_string(MOUNT_TABLE)
        .map_err(|e| SnapvaultError::message(format!("read {}: {}", MOUNT_TABLE, e)))
}

// The kernel escapes space, tab, newline and backslash as \ooo.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let digits = std::str::from_utf8(&bytes[i + 1..i + 4]).unwrap_or("");
            if let Ok(value) = u8::from_str_radix(digits, 8) {
                out.push(value);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

pub fn parse_mounts(contents: &str) -> Vec<MountEntry> {
    let mut entries = Vec::new();
    for line in contents.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            continue;
        }
        entries.push(MountEntry {
            device: unescape(fields[0]),
            mountpoint: PathBuf::from(unescape(fields[1])),
            fs_type: fields[2].to_string(),
            read_only: fields[3].split(',').any(|opt| opt == "ro"),
        });
    }
    entries
}

/// Returns the mount whose mountpoint is the longest prefix of `path`.
pub fn find_mount_in<'a>(entries: &'a [MountEntry], path: &Path) -> Option<&'a MountEntry> {
    entries
        .iter()
        .filter(|entry| path.starts_with(&entry.mountpoint))
        .max_by_key(|entry| entry.mountpoint.as_os_str().len())
}

pub fn mount_for_path(path: &Path) -> Result<Option<MountEntry>> {
    let canonical = path
        .canonicalize()
        .map_err(|e| SnapvaultError::message(format!("resolve {}: {}", path.display(), e)))?;
    let entries = parse_mounts(&read_mounts()?);
    Ok(find_mount_in(&entries, &canonical).cloned())
}
