//! CLI Adapter
//!
//! Command-line interface for the signal-ladder bot.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    CliApp, Command, OutputFormat, ParseCmd, RunCmd, StatusCmd, TradeCmd, DEFAULT_CONFIG,
};
