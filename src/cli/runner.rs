//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{AppConfig, TaskOptions};
use crate::engine::Cancellation;
use crate::error::Result;
use crate::http::{ApiClient, HttpClient, RateLimiterPool};
use crate::matcher::generate_regex;
use crate::store::Store;
use crate::tasks::{resolve_scope_config, subtask_metas, SubtaskContext, TaskRunner};
use crate::types::SyncMode;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Arguments of one `run` invocation
#[derive(Debug)]
struct RunArgs<'a> {
    config: &'a Path,
    connection: u64,
    boards: &'a [u64],
    incremental: bool,
    subtasks: &'a [String],
    jql: Option<&'a str>,
    page_size: Option<u32>,
    scope_config: Option<u64>,
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run {
                config,
                connection,
                board,
                incremental,
                subtasks,
                jql,
                page_size,
                scope_config,
            } => {
                self.run_boards(RunArgs {
                    config,
                    connection: *connection,
                    boards: board,
                    incremental: *incremental,
                    subtasks,
                    jql: jql.as_deref(),
                    page_size: *page_size,
                    scope_config: *scope_config,
                })
                .await
            }
            Commands::Subtasks => {
                self.subtasks();
                Ok(())
            }
            Commands::GenRegex { pattern } => {
                self.output_message(&json!({
                    "type": "REGEX",
                    "pattern": pattern,
                    "regex": generate_regex(pattern)
                }));
                Ok(())
            }
        }
    }

    /// Run every requested board of one connection
    ///
    /// All contexts are built before the first request, so a bad option on
    /// any board fails the whole invocation without touching the network.
    async fn run_boards(&self, args: RunArgs<'_>) -> Result<()> {
        let app = AppConfig::from_file(args.config)?;
        let connection = app.connection(args.connection)?;
        connection.validate()?;

        let store = Store::open(&app.database)?;
        let client: Arc<dyn ApiClient> = Arc::new(HttpClient::for_connection(
            connection,
            RateLimiterPool::global(),
        )?);
        let cancel = Cancellation::new();

        let mut contexts = Vec::with_capacity(args.boards.len());
        for &board_id in args.boards {
            let mut options = TaskOptions::new(args.connection, board_id)
                .with_subtasks(args.subtasks.to_vec())
                .with_sync_mode(if args.incremental {
                    SyncMode::Incremental
                } else {
                    SyncMode::FullRefresh
                });
            options.jql = args.jql.map(str::to_string);
            options.page_size = args.page_size;
            options.scope_config_id = args.scope_config;

            let scope_config = resolve_scope_config(&app, &options)?;
            let ctx = SubtaskContext::new(
                options,
                scope_config,
                client.clone(),
                store.clone(),
                cancel.clone(),
            )?;
            let runner = TaskRunner::for_context(&ctx)?;
            contexts.push((ctx, runner));
        }

        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping at the next page or row");
                interrupt.cancel();
            }
        });

        info!(
            "Running {} board(s) of connection {} into {}",
            contexts.len(),
            args.connection,
            store.location()
        );
        let reports = futures::future::try_join_all(
            contexts.iter().map(|(ctx, runner)| runner.run(ctx)),
        )
        .await?;

        for report in &reports {
            self.output_message(&json!({
                "type": "REPORT",
                "report": report
            }));
        }
        Ok(())
    }

    /// List the subtask plan
    fn subtasks(&self) {
        let subtasks: Vec<Value> = subtask_metas()
            .iter()
            .map(|meta| {
                json!({
                    "name": meta.name,
                    "description": meta.description,
                    "enabledByDefault": meta.enabled_by_default,
                    "domainTypes": meta.domain_types
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "SUBTASKS",
            "subtasks": subtasks
        }));
    }

    /// Output a message in the selected format
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
