//! CLI subcommand implementations for the vitrine binary.

pub mod doctor;
pub mod mirror_cmd;
pub mod outline_cmd;
