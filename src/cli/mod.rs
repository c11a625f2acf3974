use std::env;
use std::path::Path;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::args::Cli;
use crate::cli::commands::{backup, prune};
use crate::config::load::load_config;
use crate::config::model::FileConfig;
use crate::config::{build_run_config, RunConfig};
use crate::error::SnapvaultError;

const CONFIG_FILE: &str = "/etc/snapvault.yaml";
const VERSION: &str = env!("CARGO_PKG_VERSION");
const LICENSE_NAME: &str = "GNU GPL v3 or later";

pub mod args;
pub mod commands;

pub fn run() -> Result<()> {
    let (cli, rsync_extra) = parse_cli();
    init_tracing(cli.quiet);

    if cli.help {
        print_banner();
        print_help();
        return Ok(());
    }
    if cli.version {
        print_banner();
        println!("License: {}", LICENSE_NAME);
        return Ok(());
    }
    if !cli.quiet {
        print_banner();
    }

    let config = resolve_config(&cli, rsync_extra)?;
    if config.prune_only {
        prune::run_prune_command(&config)?;
    } else {
        backup::run_backup_command(&config)?;
    }
    Ok(())
}

/// Process exit status for an error returned by [`run`].
pub fn exit_status(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<SnapvaultError>()
        .map_or(1, SnapvaultError::exit_code)
}

fn resolve_config(cli: &Cli, rsync_extra: Vec<String>) -> crate::error::Result<RunConfig> {
    let file = match &cli.config {
        Some(path) => load_config(path)?,
        None if Path::new(CONFIG_FILE).is_file() => load_config(Path::new(CONFIG_FILE))?,
        None => FileConfig::default(),
    };
    build_run_config(file, cli.overrides(rsync_extra))
}

fn parse_cli() -> (Cli, Vec<String>) {
    let raw: Vec<String> = env::args().collect();
    let (args, rsync_extra) = split_rsync_args(raw);
    match Cli::try_parse_from(args) {
        Ok(cli) => (cli, rsync_extra),
        Err(err) => {
            if err.kind() == ErrorKind::UnknownArgument {
                if let Some(arg) = err.context().find_map(|c| {
                    if let clap::error::ContextKind::InvalidArg = c.0 {
                        Some(c.1.to_string())
                    } else {
                        None
                    }
                }) {
                    eprintln!("unknown option {}", arg);
                    std::process::exit(2);
                }
            }
            eprintln!("{}", err);
            std::process::exit(2);
        }
    }
}

/// Everything after `--rsync` is handed to rsync untouched.
fn split_rsync_args(raw: Vec<String>) -> (Vec<String>, Vec<String>) {
    let mut args = Vec::new();
    let mut rsync_extra = Vec::new();
    let mut iter = raw.into_iter();
    if let Some(bin) = iter.next() {
        args.push(bin);
    }
    let mut in_rsync = false;
    for arg in iter {
        if in_rsync {
            rsync_extra.push(arg);
            continue;
        }
        if arg == "--rsync" {
            in_rsync = true;
            continue;
        }
        args.push(arg);
    }
    (args, rsync_extra)
}

fn print_banner() {
    println!("Snapvault {}", VERSION);
}

fn print_help() {
    println!("Usage:");
    println!("  snapvault --source <dir> --destination <dir> [options] [--rsync <args...>]");
    println!("  snapvault --destination <dir> --prune-only [--keep <n>] [--dry-run]");
    println!();
    println!("Options:");
    println!("  -s, --source <dir>         Directory to back up");
    println!("  -d, --destination <dir>    Destination root (snapshots go under Backups.backupdb/<vault>)");
    println!("  -n, --vault <name>         Vault name (default: hostname)");
    println!("  -e, --exclude-file <path>  rsync exclude-from file");
    println!("      --fs-type <type>       Destination filesystem type (default: detected)");
    println!("  -p, --priority <level>     idle, normal or fast (default: idle)");
    println!("      --bwlimit <KiB/s>      Bandwidth ceiling for the copy");
    println!("      --cadence <n>          Start a new full chain every n snapshots (default: 7)");
    println!("      --keep <n>             Chains kept when pruning (default: 4)");
    println!("      --safe                 Ignore symlinks pointing outside the source tree");
    println!("      --force-full           Start a new full chain now");
    println!("      --allow-same-volume    Allow source and destination on one volume");
    println!("      --strict-volume-check  Abort when volume separation cannot be verified");
    println!("      --allow-unsupported-fs Allow destinations without hard link support");
    println!("      --prune-only           Only prune old chains");
    println!("      --prune-after          Prune old chains after a successful backup");
    println!("  -q, --quiet                Warnings and errors only, no progress spinner");
    println!("      --dry-run              Report what would happen without writing");
    println!("  -c, --config <path>        Config file (default: {})", CONFIG_FILE);
    println!("      --rsync <args...>      Pass remaining args to rsync");
    println!("  -h, --help                 Show this help");
    println!("      --version              Show version");
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rsync_passthrough_is_split_off() {
        let (args, extra) = split_rsync_args(strings(&[
            "snapvault",
            "-s",
            "/home",
            "--rsync",
            "--one-file-system",
            "--dry-run",
        ]));
        assert_eq!(args, strings(&["snapvault", "-s", "/home"]));
        assert_eq!(extra, strings(&["--one-file-system", "--dry-run"]));
    }

    #[test]
    fn errors_keep_their_exit_status() {
        let locked: anyhow::Error = SnapvaultError::Locked {
            path: PathBuf::from("/mnt/backup/Backups.backupdb/host"),
            pid: 42,
        }
        .into();
        assert_eq!(exit_status(&locked), 3);

        let sync: anyhow::Error = SnapvaultError::Sync {
            code: 23,
            snapshot: PathBuf::from("/mnt/backup/x.inProgress"),
        }
        .into();
        assert_eq!(exit_status(&sync), 23);
        assert_eq!(exit_status(&anyhow::anyhow!("other")), 1);
    }

    #[test]
    fn flags_map_to_overrides() {
        let cli = Cli::try_parse_from([
            "snapvault",
            "-s",
            "/home",
            "-d",
            "/mnt/backup",
            "--vault",
            "laptop",
            "--priority",
            "fast",
            "--force-full",
            "--prune-after",
            "--keep",
            "3",
            "--dry-run",
            "--safe",
        ])
        .expect("parse");
        let overrides = cli.overrides(vec!["--sparse".to_string()]);
        assert_eq!(overrides.source, Some(PathBuf::from("/home")));
        assert_eq!(overrides.vault.as_deref(), Some("laptop"));
        assert_eq!(overrides.keep, Some(3));
        assert!(overrides.force_full && overrides.prune_after);
        assert!(overrides.run_mode.dry_run && overrides.run_mode.safe_mode);
        assert_eq!(overrides.rsync_extra, vec!["--sparse".to_string()]);
    }
}
