//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Freshrelease connector CLI
#[derive(Parser, Debug)]
#[command(name = "freshrelease-connector")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect, extract and convert one or more boards
    Run {
        /// Configuration file (YAML or JSON)
        #[arg(short = 'C', long)]
        config: PathBuf,

        /// Connection id
        #[arg(long)]
        connection: u64,

        /// Board ids (comma-separated); boards run concurrently
        #[arg(long, value_delimiter = ',', required = true)]
        board: Vec<u64>,

        /// Only convert rows changed since the last successful run
        #[arg(long)]
        incremental: bool,

        /// Subtasks to run (comma-separated, empty = all enabled)
        #[arg(long, value_delimiter = ',')]
        subtasks: Vec<String>,

        /// Extra JQL for the board issue endpoint
        #[arg(long)]
        jql: Option<String>,

        /// Page size for list endpoints
        #[arg(long)]
        page_size: Option<u32>,

        /// Scope config id, overriding the board's
        #[arg(long)]
        scope_config: Option<u64>,
    },

    /// List the subtasks of a run, in order
    Subtasks,

    /// Print the regex compiled from a repository URL template
    GenRegex {
        /// Template, e.g. https://github.com/{namespace}/{repo_name}/commit/{commit_sha}
        pattern: String,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "freshrelease-connector",
            "run",
            "-C",
            "cfg.yaml",
            "--connection",
            "1",
            "--board",
            "8,9",
            "--incremental",
            "--subtasks",
            "collectIssues,extractIssues",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                connection,
                board,
                incremental,
                subtasks,
                ..
            } => {
                assert_eq!(connection, 1);
                assert_eq!(board, vec![8, 9]);
                assert!(incremental);
                assert_eq!(subtasks, vec!["collectIssues", "extractIssues"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_run_requires_board() {
        let parsed = Cli::try_parse_from([
            "freshrelease-connector",
            "run",
            "-C",
            "cfg.yaml",
            "--connection",
            "1",
        ]);
        assert!(parsed.is_err());
    }
}
