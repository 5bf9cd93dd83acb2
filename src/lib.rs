//! # Freshrelease Connector
//!
//! Syncs Freshrelease boards into a local DuckDB database in three layers:
//! raw API pages, tool rows in the API's own shape, and vendor-neutral
//! domain rows shared with other connectors.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use freshrelease_connector::config::{AppConfig, TaskOptions};
//! use freshrelease_connector::engine::Cancellation;
//! use freshrelease_connector::http::{HttpClient, RateLimiterPool};
//! use freshrelease_connector::store::Store;
//! use freshrelease_connector::tasks::{resolve_scope_config, SubtaskContext, TaskRunner};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> freshrelease_connector::Result<()> {
//!     let app = AppConfig::from_file("freshrelease.yaml")?;
//!     let options = TaskOptions::new(1, 8);
//!     let client = HttpClient::for_connection(app.connection(1)?, RateLimiterPool::global())?;
//!     let ctx = SubtaskContext::new(
//!         options.clone(),
//!         resolve_scope_config(&app, &options)?,
//!         Arc::new(client),
//!         Store::open(&app.database)?,
//!         Cancellation::new(),
//!     )?;
//!     let report = TaskRunner::for_context(&ctx)?.run(&ctx).await?;
//!     println!("{} subtasks in {}ms", report.subtasks.len(), report.duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Collectors  │──▶│  Extractors  │──▶│  Converters  │
//! │ API → _raw_* │   │ _raw_ → _tool│   │ _tool_ → dom │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!        │ pagination       │ matcher          │ mapping, didgen, state
//! ┌──────┴──────────────────┴──────────────────┴───────┐
//! │        http (auth, retry, rate limit) · store       │
//! └─────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the connector
pub mod error;

/// Common types and type aliases
pub mod types;

/// Connections, scope configs and task options
pub mod config;

/// Authentication implementations
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Pagination strategies
pub mod pagination;

/// DuckDB-backed tabular store
pub mod store;

/// API payloads and tool-layer tables
pub mod models;

/// Shared domain tables
pub mod domain;

/// Deterministic domain ids
pub mod didgen;

/// Type and status mapping
pub mod mapping;

/// Commit mining from remote links
pub mod matcher;

/// Converter cursors
pub mod state;

/// Collector, extractor and converter drivers
pub mod engine;

/// Subtasks and the board runner
pub mod tasks;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
