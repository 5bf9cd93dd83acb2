//! Common types used throughout the connector
//!
//! Shared type aliases and run modes used across multiple modules.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Sync Mode
// ============================================================================

/// How conversion subtasks select their input rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Convert every row in scope
    #[default]
    FullRefresh,
    /// Convert only rows modified since the last successful run
    Incremental,
}

impl SyncMode {
    /// Whether the caller asked for an incremental run
    pub fn is_incremental(self) -> bool {
        matches!(self, Self::Incremental)
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Domain Type
// ============================================================================

/// Domain a subtask contributes rows to, used by hosts to plan pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DomainType {
    /// Accounts and other cross-tool records
    Cross,
    /// Boards, issues, sprints, worklogs
    Ticket,
    /// Commits and repositories
    Code,
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cross => f.write_str("CROSS"),
            Self::Ticket => f.write_str("TICKET"),
            Self::Code => f.write_str("CODE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_mode_serde() {
        let mode: SyncMode = serde_json::from_str("\"incremental\"").unwrap();
        assert_eq!(mode, SyncMode::Incremental);
        assert!(mode.is_incremental());

        let json = serde_json::to_string(&SyncMode::FullRefresh).unwrap();
        assert_eq!(json, "\"full_refresh\"");
    }

    #[test]
    fn test_domain_type_display() {
        assert_eq!(DomainType::Ticket.to_string(), "TICKET");
        let json = serde_json::to_string(&DomainType::Cross).unwrap();
        assert_eq!(json, "\"CROSS\"");
    }
}
