//! Command dispatch and handlers.

pub mod cache;
pub mod rule;
pub mod run;

use crate::cli::Command;
use crate::context::ServiceContext;

/// Dispatch a parsed command to its handler.
///
/// Commands that touch the transport or the cache build a live context from
/// the environment; `rule` needs neither.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    match command {
        Command::Rule { id } => rule::run(*id),
        _ => {
            let ctx = ServiceContext::live()?;
            dispatch_with_context(command, &ctx)
        }
    }
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch_with_context(command: &Command, ctx: &ServiceContext) -> Result<(), String> {
    match command {
        Command::Run { recipe, object } => run::run_recipe(ctx, recipe, object.as_deref()),
        Command::Clean { recipe, object } => run::clean_recipe(ctx, recipe, object.as_deref()),
        Command::Cache { action } => cache::run(ctx, action),
        Command::Rule { id } => rule::run(*id),
    }
}

/// Builds the current-thread runtime command handlers block on.
///
/// All "parallel" dataset fetches are concurrent I/O on this one thread.
///
/// # Errors
///
/// Returns an error if the runtime cannot be built.
pub fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to build async runtime: {e}"))
}
