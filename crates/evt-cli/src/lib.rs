//! Event tracker CLI library.
//!
//! This crate provides the CLI interface for firing and timing events.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, FireArgs, RunArgs};
pub use config::{Config, DEFAULT_EVENT_PATH};
