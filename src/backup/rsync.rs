use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::backup::sync::{with_trailing_separator, SyncOutcome, SyncPlan, SyncRequest, SyncTool};
use crate::error::{Result, SnapvaultError};
use crate::util::command::{format_command, prioritized_command};

const SPINNER_TICK: Duration = Duration::from_millis(120);

#[derive(Debug, Clone)]
pub struct Rsync {
    program: PathBuf,
    show_progress: bool,
}

impl Rsync {
    pub fn new(show_progress: bool) -> Self {
        Self {
            program: PathBuf::from("rsync"),
            show_progress,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Argument list for one snapshot copy, without the priority wrapper.
    pub fn args(request: &SyncRequest) -> Vec<OsString> {
        let options = &request.options;
        let mut args: Vec<OsString> = vec![
            "-a".into(),
            "--delete".into(),
            "--hard-links".into(),
            "--numeric-ids".into(),
            "--stats".into(),
        ];
        if options.capabilities.xattrs {
            args.push("--xattrs".into());
        }
        if options.capabilities.acls {
            args.push("--acls".into());
        }
        if options.capabilities.crtimes {
            args.push("--crtimes".into());
        }
        if options.safe_links {
            args.push("--safe-links".into());
        }
        if let Some(limit) = options.bwlimit {
            args.push(format!("--bwlimit={}", limit).into());
        }
        if let Some(excludes) = &options.exclude_file {
            let mut arg = OsString::from("--exclude-from=");
            arg.push(excludes);
            args.push(arg);
        }
        if let SyncPlan::Incremental { link_reference } = &request.plan {
            let mut arg = OsString::from("--link-dest=");
            arg.push(link_reference);
            args.push(arg);
        }
        args.extend(options.extra_args.iter().map(OsString::from));
        args.push(with_trailing_separator(&request.source));
        args.push(with_trailing_separator(&request.destination));
        args
    }

    pub fn command(&self, request: &SyncRequest) -> Command {
        let mut cmd = prioritized_command(self.program.as_os_str(), request.options.priority);
        cmd.args(Self::args(request));
        cmd
    }

    fn spinner(&self, request: &SyncRequest) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(format!("copying into {}", request.destination.display()));
        bar.enable_steady_tick(SPINNER_TICK);
        bar
    }
}

impl SyncTool for Rsync {
    fn sync(&self, request: &SyncRequest, transcript: &Path) -> Result<SyncOutcome> {
        let mut cmd = self.command(request);
        debug!(command = %format_command(&cmd), "run rsync");
        let log = File::create(transcript)
            .map_err(|e| SnapvaultError::message(format!("create {}: {}", transcript.display(), e)))?;
        let log_err = log.try_clone()?;
        cmd.stdin(Stdio::null()).stdout(log).stderr(log_err);

        let started = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| SnapvaultError::message(format!("{}: {}", self.program.display(), e)))?;
        let spinner = self.spinner(request);
        let status = child.wait();
        spinner.finish_and_clear();
        let status = status?;
        let duration = started.elapsed();

        let text = std::fs::read(transcript)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();
        let stats = parse_stats(&text);
        Ok(SyncOutcome {
            exit_code: status.code().unwrap_or(1),
            duration,
            transferred_bytes: stats.transferred_bytes,
            files_transferred: stats.files_transferred,
        })
    }

    fn describe(&self, request: &SyncRequest) -> String {
        format_command(&self.command(request))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub transferred_bytes: Option<u64>,
    pub files_transferred: Option<u64>,
}

fn parse_count(value: &str) -> Option<u64> {
    let digits: String = value
        .split_whitespace()
        .next()?
        .chars()
        .filter(|c| *c != ',' && *c != '.')
        .collect();
    digits.parse().ok()
}

/// Extracts counts from the `--stats` summary; older rsync says "files", newer "regular files".
pub fn parse_stats(text: &str) -> TransferStats {
    let mut stats = TransferStats::default();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "Total transferred file size" => stats.transferred_bytes = parse_count(value),
            "Number of regular files transferred" | "Number of files transferred" => {
                stats.files_transferred = parse_count(value)
            }
            _ => {}
        }
    }
    stats
}
