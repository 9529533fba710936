//! CLI argument definitions.

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `orgscope`.
#[derive(Debug, Parser)]
#[command(name = "orgscope", version, about = "Inspect org metadata health")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a recipe and print its result as JSON.
    Run {
        /// Recipe name (e.g. `apex-classes`, `permission-matrix`).
        recipe: String,
        /// Object developer name, for object-scoped recipes.
        #[arg(long)]
        object: Option<String>,
    },
    /// Invalidate a recipe's cached datasets so the next run refetches.
    Clean {
        /// Recipe name.
        recipe: String,
        /// Object developer name, for object-scoped recipes.
        #[arg(long)]
        object: Option<String>,
    },
    /// Inspect or clear the dataset cache.
    Cache {
        /// The cache action to perform.
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Explain a score rule by id.
    Rule {
        /// The rule id, as found in a record's `badReasonIds`.
        id: u32,
    },
}

/// Cache subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Print shape and age metadata for every cache entry.
    Details,
    /// Remove every cache entry.
    Clear,
}

#[cfg(test)]
mod tests {
    use super::{CacheAction, Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_run_with_object() {
        let cli = Cli::parse_from(["orgscope", "run", "object-explorer", "--object", "Invoice__c"]);
        let Command::Run { recipe, object } = cli.command else { panic!("wrong command") };
        assert_eq!(recipe, "object-explorer");
        assert_eq!(object.as_deref(), Some("Invoice__c"));
    }

    #[test]
    fn parses_cache_details() {
        let cli = Cli::parse_from(["orgscope", "cache", "details"]);
        assert!(matches!(cli.command, Command::Cache { action: CacheAction::Details }));
    }

    #[test]
    fn parses_rule_lookup() {
        let cli = Cli::parse_from(["orgscope", "rule", "3"]);
        assert!(matches!(cli.command, Command::Rule { id: 3 }));
    }
}
