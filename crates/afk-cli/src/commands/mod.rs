//! CLI subcommand implementations.

pub mod accrual;
pub mod admin;
pub mod stats;
pub mod user;
pub mod util;
