use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Idle,
    Normal,
    Fast,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunMode {
    pub dry_run: bool,
    pub safe_mode: bool,
    pub quiet: bool,
}

impl Priority {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "idle" | "low" => Ok(Priority::Idle),
            "normal" => Ok(Priority::Normal),
            "fast" | "high" => Ok(Priority::Fast),
            _ => Err(format!(
                "invalid priority {}; expected idle, normal, or fast",
                value
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Idle => "idle",
            Priority::Normal => "normal",
            Priority::Fast => "fast",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Idle
    }
}

/// Whether a snapshot copies everything or hard-links against a prior one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Full,
    Incremental,
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotKind::Full => f.write_str("full"),
            SnapshotKind::Incremental => f.write_str("incremental"),
        }
    }
}

/// A snapshot directory is provisional until its copy has been committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotState {
    Provisional,
    Complete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parse_accepts_aliases() {
        assert_eq!(Priority::parse("IDLE").unwrap(), Priority::Idle);
        assert_eq!(Priority::parse(" normal ").unwrap(), Priority::Normal);
        assert_eq!(Priority::parse("high").unwrap(), Priority::Fast);
        assert!(Priority::parse("turbo").is_err());
    }
}
