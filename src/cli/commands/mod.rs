pub mod backup;
pub mod prune;
