//! Sequential subtask runner

use super::{subtask_metas, SubtaskContext, SubtaskMeta};
use crate::engine::SyncStats;
use crate::error::{Error, Result};
use serde::Serialize;
use std::time::Instant;
use tracing::{error, info};

/// Outcome of one subtask
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtaskReport {
    /// Subtask name
    pub name: &'static str,
    /// What it did
    pub stats: SyncStats,
}

/// Outcome of a board run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    pub connection_id: u64,
    pub board_id: u64,
    pub subtasks: Vec<SubtaskReport>,
    pub duration_ms: u64,
}

impl TaskReport {
    /// Stats of a subtask by name
    pub fn stats(&self, name: &str) -> Option<&SyncStats> {
        self.subtasks
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.stats)
    }
}

/// Runs a plan of subtasks for one board, one after another
#[derive(Debug)]
pub struct TaskRunner {
    plan: Vec<SubtaskMeta>,
}

impl TaskRunner {
    /// Plan from an explicit selection, or every default subtask when empty
    ///
    /// Selected subtasks keep the execution order of the full list.
    pub fn new(selection: &[String]) -> Result<Self> {
        let all = subtask_metas();
        if let Some(unknown) = selection
            .iter()
            .find(|name| !all.iter().any(|m| m.name == name.as_str()))
        {
            return Err(Error::UnknownSubtask {
                name: unknown.clone(),
            });
        }

        let plan = all
            .into_iter()
            .filter(|m| {
                if selection.is_empty() {
                    m.enabled_by_default
                } else {
                    selection.iter().any(|name| name == m.name)
                }
            })
            .collect();
        Ok(Self { plan })
    }

    /// Plan for the subtasks named in the context's options
    pub fn for_context(ctx: &SubtaskContext) -> Result<Self> {
        Self::new(&ctx.options.subtasks)
    }

    /// Subtasks that will run, in order
    pub fn plan(&self) -> &[SubtaskMeta] {
        &self.plan
    }

    /// Run the plan
    ///
    /// The first failure stops the run; rows written by earlier subtasks
    /// stay in the store.
    pub async fn run(&self, ctx: &SubtaskContext) -> Result<TaskReport> {
        let start = Instant::now();
        ctx.prepare().await?;

        let mut report = TaskReport {
            connection_id: ctx.connection_id(),
            board_id: ctx.board_id(),
            ..TaskReport::default()
        };
        for meta in &self.plan {
            ctx.cancel.check()?;
            info!(
                "Board {}: starting {} ({})",
                ctx.board_id(),
                meta.name,
                meta.description
            );
            let step = Instant::now();
            let stats = meta.run(ctx).await.map_err(|e| {
                error!("Board {}: {} failed: {e}", ctx.board_id(), meta.name);
                e.in_subtask(meta.name)
            })?;
            info!(
                "Board {}: finished {} in {}ms ({} in, {} out)",
                ctx.board_id(),
                meta.name,
                step.elapsed().as_millis(),
                stats.records_in,
                stats.records_out
            );
            report.subtasks.push(SubtaskReport {
                name: meta.name,
                stats,
            });
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }
}
