//! CLI subcommands

pub mod generate;
pub mod scan;
pub mod status;
pub mod watch;
