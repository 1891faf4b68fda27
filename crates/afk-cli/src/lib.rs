//! AFK credits CLI library.
//!
//! This crate provides the command-line front end for the AFK credits plugin.

mod cli;
pub mod commands;
mod config;

pub use cli::{AdminAction, Cli, Commands, ConfigAction, UserAction};
pub use config::Config;
