pub mod decision;
pub mod history;
pub mod layout;
pub mod materialize;
pub mod prune;
