use std::path::PathBuf;

use clap::Parser;

use crate::config::Overrides;
use crate::types::RunMode;

#[derive(Parser, Debug)]
#[command(name = "snapvault", disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    #[arg(long, short = 's')]
    pub source: Option<PathBuf>,
    #[arg(long, short = 'd')]
    pub destination: Option<PathBuf>,
    #[arg(long, short = 'n')]
    pub vault: Option<String>,
    #[arg(long, short = 'e')]
    pub exclude_file: Option<PathBuf>,
    #[arg(long)]
    pub fs_type: Option<String>,
    #[arg(long, short = 'p')]
    pub priority: Option<String>,
    #[arg(long)]
    pub bwlimit: Option<u32>,
    #[arg(long)]
    pub cadence: Option<usize>,
    #[arg(long)]
    pub keep: Option<usize>,

    #[arg(long)]
    pub safe: bool,
    #[arg(long)]
    pub force_full: bool,
    #[arg(long)]
    pub allow_same_volume: bool,
    #[arg(long)]
    pub strict_volume_check: bool,
    #[arg(long)]
    pub allow_unsupported_fs: bool,
    #[arg(long)]
    pub prune_only: bool,
    #[arg(long)]
    pub prune_after: bool,
    #[arg(long, short = 'q')]
    pub quiet: bool,
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    #[arg(long, short = 'h')]
    pub help: bool,
    #[arg(long)]
    pub version: bool,
}

impl Cli {
    pub fn run_mode(&self) -> RunMode {
        RunMode {
            dry_run: self.dry_run,
            safe_mode: self.safe,
            quiet: self.quiet,
        }
    }

    pub fn overrides(&self, rsync_extra: Vec<String>) -> Overrides {
        Overrides {
            source: self.source.clone(),
            destination: self.destination.clone(),
            vault: self.vault.clone(),
            exclude_file: self.exclude_file.clone(),
            fs_type: self.fs_type.clone(),
            priority: self.priority.clone(),
            bwlimit: self.bwlimit,
            cadence: self.cadence,
            keep: self.keep,
            force_full: self.force_full,
            allow_same_volume: self.allow_same_volume,
            strict_volume_check: self.strict_volume_check,
            allow_unsupported_fs: self.allow_unsupported_fs,
            prune_only: self.prune_only,
            prune_after: self.prune_after,
            rsync_extra,
            run_mode: self.run_mode(),
        }
    }
}
