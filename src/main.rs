fn main() {
    if let Err(err) = snapvault::cli::run() {
        eprintln!("error: {:#}", err);
        std::process::exit(snapvault::cli::exit_status(&err));
    }
}
