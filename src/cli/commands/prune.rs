use crate::backup::run_prune;
use crate::config::RunConfig;
use crate::error::{Result, SnapvaultError};
use crate::snapshot::prune::{PruneAction, PruneOutcome};

pub fn run_prune_command(config: &RunConfig) -> Result<()> {
    let outcome = run_prune(config)?;
    if !config.run_mode.quiet || matches!(outcome, PruneOutcome::Pruned(_)) {
        print_outcome(&outcome);
    }
    match outcome.failure() {
        Some(event) => Err(SnapvaultError::message(format!(
            "pruning stopped at {}",
            event.path.display()
        ))),
        None => Ok(()),
    }
}

/// One line per group; deletions are printed even in quiet mode.
pub fn print_outcome(outcome: &PruneOutcome) {
    match outcome {
        PruneOutcome::WithinRetention { groups } => {
            println!("prune: {} chain(s) within retention, nothing to delete", groups);
        }
        PruneOutcome::Skipped { newest } => {
            println!(
                "prune: skipped, newest chain {} has no complete snapshot",
                newest.display()
            );
        }
        PruneOutcome::Pruned(events) => {
            for event in events {
                match &event.action {
                    PruneAction::Deleted => println!("prune: deleted {}", event.path.display()),
                    PruneAction::WouldDelete => {
                        println!("prune: would delete {}", event.path.display())
                    }
                    PruneAction::Failed(err) => {
                        println!("prune: failed to delete {}: {}", event.path.display(), err)
                    }
                }
            }
        }
    }
}
