pub mod fs_type;
pub mod identity;
