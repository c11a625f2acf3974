use std::ffi::OsStr;
use std::process::Command;

use crate::types::Priority;

/// Builds `program` wrapped in the scheduling tools matching `priority`.
pub fn prioritized_command(program: &OsStr, priority: Priority) -> Command {
    match priority {
        Priority::Idle => {
            let mut cmd = Command::new("nice");
            cmd.arg("-n")
                .arg("19")
                .arg("ionice")
                .arg("-c")
                .arg("3")
                .arg(program);
            cmd
        }
        Priority::Normal => {
            let mut cmd = Command::new("nice");
            cmd.arg("-n").arg("10").arg(program);
            cmd
        }
        Priority::Fast => Command::new(program),
    }
}

pub fn format_command(cmd: &Command) -> String {
    let program = cmd.get_program().to_string_lossy();
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| a.to_string_lossy().to_string())
        .collect();
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_wraps_in_nice_and_ionice() {
        let mut cmd = prioritized_command(OsStr::new("rsync"), Priority::Idle);
        cmd.arg("-a");
        assert_eq!(format_command(&cmd), "nice -n 19 ionice -c 3 rsync -a");
    }

    #[test]
    fn fast_runs_program_directly() {
        let cmd = prioritized_command(OsStr::new("rsync"), Priority::Fast);
        assert_eq!(format_command(&cmd), "rsync");
        let normal = prioritized_command(OsStr::new("rsync"), Priority::Normal);
        assert_eq!(format_command(&normal), "nice -n 10 rsync");
    }
}
