//! CLI subcommand implementations for the recon binary.

pub mod doctor;
pub mod output;
pub mod scout_cmd;
