use chrono::{Local, Utc};

use crate::backup::rsync::Rsync;
use crate::backup::{run_backup, BackupReport};
use crate::cli::commands::prune::print_outcome;
use crate::config::RunConfig;
use crate::error::Result;
use crate::snapshot::decision::ChainTarget;
use crate::snapshot::prune::PruneOutcome;

pub fn run_backup_command(config: &RunConfig) -> Result<()> {
    let quiet = config.run_mode.quiet;
    if !quiet {
        println!("{}", Local::now().format("%d-%m-%Y %H:%M"));
    }
    let tool = Rsync::new(!quiet);
    let report = run_backup(config, &tool, Utc::now())?;
    if !quiet {
        print_report(&report);
    } else if let Some(outcome @ PruneOutcome::Pruned(_)) = &report.prune {
        print_outcome(outcome);
    }
    Ok(())
}

fn print_report(report: &BackupReport) {
    let decision = &report.decision;
    let chain = match &decision.chain {
        ChainTarget::New => format!("new chain {}", report.plan.group.display()),
        ChainTarget::Existing { path, .. } => format!("chain {}", path.display()),
    };
    println!("{} snapshot ({}) into {}", decision.kind, decision.reason, chain);
    if let Some(reference) = &decision.link_reference {
        println!("  link reference: {}", reference.display());
    }

    match (&report.commit, &report.command) {
        (Some(commit), _) => {
            println!("snapshot: {}", commit.snapshot.display());
            let outcome = &commit.outcome;
            println!("  elapsed: {:.1}s", outcome.duration.as_secs_f64());
            if let Some(files) = outcome.files_transferred {
                println!("  files transferred: {}", files);
            }
            if let Some(bytes) = outcome.transferred_bytes {
                println!("  bytes transferred: {}", bytes);
            }
            if let Some(transcript) = &commit.transcript {
                println!("  transcript: {}", transcript.display());
            }
        }
        (None, Some(command)) => {
            println!("dry-run: would create {}", report.plan.committed.display());
            println!("dry-run: {}", command);
        }
        (None, None) => {}
    }

    if let Some(outcome) = &report.prune {
        print_outcome(outcome);
    }
}
