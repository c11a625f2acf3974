use std::path::{Component, Path};

/// A single path component made of letters, digits, '.', '-', '_'.
pub fn is_safe_name(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

pub fn path_has_parent_dir(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_names() {
        assert!(is_safe_name("Backups.backupdb"));
        assert!(!is_safe_name(".."));
        assert!(!is_safe_name("a/b"));
        assert!(path_has_parent_dir(Path::new("/mnt/../etc")));
        assert!(!path_has_parent_dir(Path::new("/mnt/backup")));
    }
}
