use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::config::model::FileConfig;
use crate::error::{ConfigError, Result, SnapvaultError};

pub fn load_config(path: &Path) -> Result<FileConfig> {
    let mut contents = String::new();
    File::open(path)
        .map_err(|e| SnapvaultError::message(format!("open {}: {}", path.display(), e)))?
        .read_to_string(&mut contents)
        .map_err(|e| SnapvaultError::message(format!("read {}: {}", path.display(), e)))?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<FileConfig> {
    if contents.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    let cfg: FileConfig =
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::fs_type::FsType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_full_config() {
        let mut file = NamedTempFile::new().expect("tempfile");
        let yaml = r#"
source: "/home"
destination: "/mnt/backup"
vault: "laptop"
cadence: 5
keep: 3
excludeFile: "/etc/snapvault.excludes"
fsType: "ext4"
priority: "normal"
bwlimit: 20000
strictVolumeCheck: true
rsync: ["--one-file-system"]
"#;
        file.write_all(yaml.as_bytes()).expect("write");
        let cfg = load_config(file.path()).expect("load");
        assert_eq!(cfg.vault.as_deref(), Some("laptop"));
        assert_eq!(cfg.cadence, Some(5));
        assert_eq!(cfg.fs_type, Some(FsType::Ext4));
        assert_eq!(cfg.strict_volume_check, Some(true));
        assert_eq!(cfg.rsync, vec!["--one-file-system".to_string()]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_config("sourc: /home\n").unwrap_err();
        assert!(matches!(err, SnapvaultError::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn empty_file_is_default() {
        let cfg = parse_config("\n").expect("parse");
        assert!(cfg.source.is_none());
        assert!(cfg.rsync.is_empty());
    }
}
