pub mod backup;
pub mod cli;
pub mod config;
pub mod disk;
pub mod error;
pub mod mount;
pub mod snapshot;
pub mod types;
pub mod util;
