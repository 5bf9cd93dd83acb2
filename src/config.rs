//! Configuration types for connections, scopes and task runs
//!
//! Connections, scope configs and boards are supplied by a YAML (or JSON)
//! file before a run starts; the connector never writes them back. Task
//! options are strongly typed and validated before any network or store
//! activity.

use crate::error::{Error, Result, ResultExt};
use crate::types::{BackoffType, SyncMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Page size used when the caller does not pick one
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page size the remote API accepts
pub const MAX_PAGE_SIZE: u32 = 100;

// ============================================================================
// Top-Level App Config
// ============================================================================

/// Everything the connector needs to run, loaded from one file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// DuckDB database file, or `:memory:`
    #[serde(default = "default_database")]
    pub database: String,

    /// Remote connections
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,

    /// Shareable scope configs, referenced by id
    #[serde(default)]
    pub scope_configs: Vec<ScopeConfigEntry>,

    /// Boards in scope
    #[serde(default)]
    pub boards: Vec<BoardConfig>,
}

fn default_database() -> String {
    "freshrelease.duckdb".to_string()
}

impl AppConfig {
    /// Load config from a YAML or JSON file (chosen by extension)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(&contents)?),
            _ => Self::from_yaml_str(&contents),
        }
    }

    /// Parse config from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Find a connection by id
    pub fn connection(&self, id: u64) -> Result<&ConnectionConfig> {
        self.connections
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::bad_input(format!("unknown connectionId:{id}")))
    }

    /// Find a scope config by id
    pub fn scope_config(&self, id: u64) -> Result<&ScopeConfig> {
        self.scope_configs
            .iter()
            .find(|s| s.id == id)
            .map(|s| &s.config)
            .ok_or_else(|| Error::bad_input(format!("unknown scopeConfigId:{id}")))
    }

    /// Find a configured board
    pub fn board(&self, connection_id: u64, board_id: u64) -> Option<&BoardConfig> {
        self.boards
            .iter()
            .find(|b| b.connection_id == connection_id && b.board_id == board_id)
    }
}

// ============================================================================
// Connection
// ============================================================================

/// A remote Freshrelease endpoint and its credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Connection id, the namespace of every generated id
    pub id: u64,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// REST root, e.g. `https://acme.freshrelease.com/rest/`
    pub endpoint: String,

    /// Authentication mode
    #[serde(default)]
    pub auth: ConnectionAuth,

    /// Request budget shared by every board of this connection
    #[serde(default)]
    pub rate_limit_per_hour: Option<u32>,

    /// Optional proxy URL
    #[serde(default)]
    pub proxy: Option<String>,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

impl ConnectionConfig {
    /// Endpoint with a guaranteed trailing slash
    pub fn base_url(&self) -> String {
        if self.endpoint.ends_with('/') {
            self.endpoint.clone()
        } else {
            format!("{}/", self.endpoint)
        }
    }

    /// Check the connection before use
    pub fn validate(&self) -> Result<()> {
        if self.id == 0 {
            return Err(Error::bad_input("invalid connectionId:0"));
        }
        if self.endpoint.is_empty() {
            return Err(Error::missing_field("endpoint"));
        }
        url::Url::parse(&self.base_url())
            .map_err(|e| Error::invalid_value("endpoint", e.to_string()))?;
        Ok(())
    }
}

/// Authentication as written in the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionAuth {
    /// No authentication
    #[default]
    None,

    /// Username and password (or API token as password)
    Basic {
        /// Username
        username: String,
        /// Password or API token
        password: String,
    },

    /// Personal access token sent as a bearer token
    AccessToken {
        /// The token value
        token: String,
    },
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff type
    #[serde(default)]
    pub backoff: BackoffType,

    /// Initial backoff in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            backoff: BackoffType::Exponential,
            initial_backoff_ms: default_initial_ms(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_ms() -> u64 {
    100
}

// ============================================================================
// Board and Scope Config
// ============================================================================

/// A board in scope for a connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Owning connection
    pub connection_id: u64,
    /// Remote board id
    pub board_id: u64,
    /// Scope config applied to this board
    #[serde(default)]
    pub scope_config_id: Option<u64>,
}

/// A scope config stored under an id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfigEntry {
    /// Scope config id
    pub id: u64,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// The configuration itself
    #[serde(flatten)]
    pub config: ScopeConfig,
}

/// Per-scope mapping and mining rules
///
/// Maps are ordered so the serialized form is stable; the serialized form
/// is the fingerprint that decides whether an incremental run is allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Issue type name to its mapping block
    #[serde(default, alias = "typeMappings")]
    pub type_mappings: BTreeMap<String, TypeMapping>,

    /// Custom field holding story points
    #[serde(default, alias = "storyPointField")]
    pub story_point_field: String,

    /// Regex whose first group is a commit SHA
    #[serde(default, alias = "remotelinkCommitShaPattern")]
    pub remotelink_commit_sha_pattern: String,

    /// Ordered repository link patterns, first match wins
    #[serde(default, alias = "remotelinkRepoPattern")]
    pub remotelink_repo_pattern: Vec<CommitUrlPattern>,
}

/// Mapping block for one issue type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMapping {
    /// Standard type, empty keeps the original
    #[serde(default, alias = "standardType")]
    pub standard_type: String,

    /// Status name to its standard status
    #[serde(default, alias = "statusMappings")]
    pub status_mappings: BTreeMap<String, StatusMapping>,
}

/// Standard status for one original status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMapping {
    /// Standard status, empty keeps the original
    #[serde(default, alias = "standardStatus")]
    pub standard_status: String,
}

/// A repository link pattern
///
/// `regex` wins when set; otherwise `pattern` is a URL template such as
/// `https://gitlab.com/{namespace}/{repo_name}/-/commit/{commit_sha}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitUrlPattern {
    /// URL template
    #[serde(default)]
    pub pattern: String,
    /// Named-capture regex
    #[serde(default)]
    pub regex: String,
}

impl ScopeConfig {
    /// Compile every regex so bad patterns surface before any I/O
    pub fn validate(&self) -> Result<()> {
        crate::matcher::LinkMatcher::new(self).map(|_| ())
    }

    /// Stable fingerprint of the mapping rules
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(&self.type_mappings).unwrap_or_default()
    }
}

// ============================================================================
// Task Options
// ============================================================================

/// Options of a single task run for one board
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOptions {
    /// Connection to collect from
    #[serde(default)]
    pub connection_id: u64,

    /// Board to collect
    #[serde(default)]
    pub board_id: u64,

    /// Scope config id, used when no inline config is given
    #[serde(default)]
    pub scope_config_id: Option<u64>,

    /// Inline scope config
    #[serde(default)]
    pub scope_config: Option<ScopeConfig>,

    /// Page size for list endpoints
    #[serde(default)]
    pub page_size: Option<u32>,

    /// Full or incremental conversion
    #[serde(default)]
    pub sync_mode: SyncMode,

    /// Extra JQL passed through to the board issue endpoint
    #[serde(default)]
    pub jql: Option<String>,

    /// Explicit subtask selection, empty runs the defaults
    #[serde(default)]
    pub subtasks: Vec<String>,
}

impl TaskOptions {
    /// Create options for a board
    pub fn new(connection_id: u64, board_id: u64) -> Self {
        Self {
            connection_id,
            board_id,
            ..Self::default()
        }
    }

    /// Set the scope config
    #[must_use]
    pub fn with_scope_config(mut self, config: ScopeConfig) -> Self {
        self.scope_config = Some(config);
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Set the sync mode
    #[must_use]
    pub fn with_sync_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = mode;
        self
    }

    /// Restrict the run to the named subtasks
    #[must_use]
    pub fn with_subtasks(mut self, names: Vec<String>) -> Self {
        self.subtasks = names;
        self
    }

    /// Reject options that cannot describe a board
    pub fn validate(&self) -> Result<()> {
        if self.connection_id == 0 {
            return Err(Error::bad_input(format!(
                "invalid connectionId:{}",
                self.connection_id
            )));
        }
        if self.board_id == 0 {
            return Err(Error::bad_input(format!(
                "invalid boardId:{}",
                self.board_id
            )));
        }
        if let Some(config) = &self.scope_config {
            config.validate()?;
        }
        Ok(())
    }

    /// Page size after defaulting and clamping
    pub fn effective_page_size(&self) -> u32 {
        match self.page_size {
            None | Some(0) => DEFAULT_PAGE_SIZE,
            Some(size) => size.min(MAX_PAGE_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const SAMPLE: &str = r#"
database: ":memory:"
connections:
  - id: 1
    name: acme
    endpoint: "https://acme.freshrelease.com/rest"
    auth:
      type: basic
      username: bot
      password: secret
    rate_limit_per_hour: 3000
scope_configs:
  - id: 7
    name: default
    typeMappings:
      Bug:
        standardType: BUG
        statusMappings:
          Open:
            standardStatus: TODO
    remotelinkCommitShaPattern: ".*/commit/(.*)"
boards:
  - connection_id: 1
    board_id: 8
    scope_config_id: 7
"#;

    #[test]
    fn test_parse_app_config() {
        let config = AppConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.database, ":memory:");

        let conn = config.connection(1).unwrap();
        assert_eq!(conn.base_url(), "https://acme.freshrelease.com/rest/");
        assert_eq!(conn.rate_limit_per_hour, Some(3000));
        assert!(matches!(conn.auth, ConnectionAuth::Basic { .. }));
        assert_eq!(conn.http.max_retries, 5);

        let scope = config.scope_config(7).unwrap();
        assert_eq!(
            scope.type_mappings["Bug"].status_mappings["Open"].standard_status,
            "TODO"
        );
        assert_eq!(scope.remotelink_commit_sha_pattern, ".*/commit/(.*)");

        let board = config.board(1, 8).unwrap();
        assert_eq!(board.scope_config_id, Some(7));
    }

    #[test]
    fn test_unknown_ids_are_input_errors() {
        let config = AppConfig::from_yaml_str(SAMPLE).unwrap();
        assert!(config.connection(2).unwrap_err().is_input_error());
        assert!(config.scope_config(1).unwrap_err().is_input_error());
        assert!(config.board(1, 9).is_none());
    }

    #[test]
    fn test_task_options_validation() {
        assert!(TaskOptions::new(1, 8).validate().is_ok());

        let err = TaskOptions::new(0, 8).validate().unwrap_err();
        assert_eq!(err.to_string(), "Bad input: invalid connectionId:0");

        let err = TaskOptions::new(1, 0).validate().unwrap_err();
        assert_eq!(err.to_string(), "Bad input: invalid boardId:0");
    }

    #[test]
    fn test_task_options_rejects_bad_regex() {
        let scope = ScopeConfig {
            remotelink_commit_sha_pattern: "(unclosed".to_string(),
            ..ScopeConfig::default()
        };
        let err = TaskOptions::new(1, 8)
            .with_scope_config(scope)
            .validate()
            .unwrap_err();
        assert!(err.is_input_error());
    }

    #[test_case(None, 50 ; "default")]
    #[test_case(Some(0), 50 ; "zero falls back to default")]
    #[test_case(Some(20), 20 ; "caller override")]
    #[test_case(Some(100), 100 ; "at max")]
    #[test_case(Some(500), 100 ; "clamped")]
    fn test_effective_page_size(size: Option<u32>, expected: u32) {
        let mut options = TaskOptions::new(1, 8);
        options.page_size = size;
        assert_eq!(options.effective_page_size(), expected);
    }

    #[test]
    fn test_task_options_camel_case() {
        let options: TaskOptions = serde_json::from_str(
            r#"{"connectionId": 3, "boardId": 4, "pageSize": 25, "syncMode": "incremental"}"#,
        )
        .unwrap();
        assert_eq!(options.connection_id, 3);
        assert_eq!(options.board_id, 4);
        assert_eq!(options.effective_page_size(), 25);
        assert!(options.sync_mode.is_incremental());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let config = AppConfig::from_yaml_str(SAMPLE).unwrap();
        let scope = config.scope_config(7).unwrap();
        assert_eq!(scope.fingerprint(), scope.clone().fingerprint());
        assert_ne!(scope.fingerprint(), ScopeConfig::default().fingerprint());
    }
}
