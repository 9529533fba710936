//! Core library entry for the `orgscope` CLI.
//!
//! The engine pulls org metadata through a transport port, enriches it with
//! a dependency graph, scores every record against a best-practice rule
//! table, and composes datasets into UI-ready lists, trees, and matrices.

pub mod adapters;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod context;
pub mod dataset;
pub mod graph;
pub mod ports;
pub mod recipe;
pub mod record;
pub mod score;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution
/// fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli.command)
}
