//! Deterministic domain identifiers
//!
//! Every domain row is keyed by a string built from the plugin name, the
//! tool entity it came from, the owning connection and the local id parts:
//!
//! ```text
//! freshrelease:FreshreleaseIssue:1:10042
//! freshrelease:FreshreleaseWorklog:1:10042:3001
//! ```
//!
//! Separators inside a part are escaped so distinct tuples never render to
//! the same string.

use crate::store::Record;
use std::fmt::Display;

/// Plugin prefix of every generated id
pub const PLUGIN_NAME: &str = "freshrelease";

/// Builds global ids for one tool entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainIdGenerator {
    entity: &'static str,
}

impl DomainIdGenerator {
    /// Create a generator for an entity name
    pub const fn new(entity: &'static str) -> Self {
        Self { entity }
    }

    /// Create a generator for a tool-layer record type
    pub const fn of<R: Record>() -> Self {
        Self::new(R::ENTITY)
    }

    /// Entity name this generator stamps into ids
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Leading part shared by every id of a connection
    pub fn prefix(&self, connection_id: u64) -> String {
        format!("{PLUGIN_NAME}:{}:{connection_id}:", self.entity)
    }

    /// Id for a single local id
    pub fn generate(&self, connection_id: u64, local_id: impl Display) -> String {
        self.generate_parts(connection_id, &[&local_id])
    }

    /// Id for a composite local key
    pub fn generate_parts(&self, connection_id: u64, parts: &[&dyn Display]) -> String {
        let mut id = format!("{PLUGIN_NAME}:{}:{connection_id}", self.entity);
        for part in parts {
            id.push(':');
            push_escaped(&mut id, &part.to_string());
        }
        id
    }
}

/// Append `part` with `%` and `:` escaped
fn push_escaped(id: &mut String, part: &str) {
    for c in part.chars() {
        match c {
            '%' => id.push_str("%25"),
            ':' => id.push_str("%3A"),
            c => id.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ISSUE: DomainIdGenerator = DomainIdGenerator::new("FreshreleaseIssue");
    const SPRINT: DomainIdGenerator = DomainIdGenerator::new("FreshreleaseSprint");

    #[test]
    fn test_prefix_starts_every_id() {
        assert_eq!(ISSUE.prefix(1), "freshrelease:FreshreleaseIssue:1:");
        assert!(ISSUE.generate(1, 10042).starts_with(&ISSUE.prefix(1)));
        assert!(!ISSUE.generate(12, 3).starts_with(&ISSUE.prefix(1)));
    }

    #[test]
    fn test_generate_format() {
        assert_eq!(ISSUE.generate(1, 10042), "freshrelease:FreshreleaseIssue:1:10042");
        let worklog = DomainIdGenerator::new("FreshreleaseWorklog");
        assert_eq!(
            worklog.generate_parts(1, &[&10042, &3001]),
            "freshrelease:FreshreleaseWorklog:1:10042:3001"
        );
    }

    #[test]
    fn test_generate_is_deterministic() {
        assert_eq!(ISSUE.generate(3, 77), ISSUE.generate(3, 77));
        assert_eq!(ISSUE.generate(3, "abc"), ISSUE.generate(3, "abc".to_string()));
    }

    #[test]
    fn test_generate_distinct_across_connections() {
        assert_ne!(ISSUE.generate(1, 77), ISSUE.generate(2, 77));
    }

    #[test]
    fn test_generate_distinct_across_entities() {
        assert_ne!(ISSUE.generate(1, 77), SPRINT.generate(1, 77));
    }

    #[test]
    fn test_separators_are_escaped() {
        let account = DomainIdGenerator::new("FreshreleaseAccount");
        let joined = account.generate(1, "a:b");
        let split = account.generate_parts(1, &[&"a", &"b"]);
        assert_eq!(joined, "freshrelease:FreshreleaseAccount:1:a%3Ab");
        assert_ne!(joined, split);
        assert_eq!(account.generate(1, "50%"), "freshrelease:FreshreleaseAccount:1:50%25");
        assert_ne!(account.generate(1, "a%3Ab"), joined);
    }

    #[test]
    fn test_escaping_covers_every_separator_in_a_part() {
        let changelog = DomainIdGenerator::new("FreshreleaseIssueChangelogItems");
        assert_eq!(
            changelog.generate_parts(2, &[&9, &"Fix: 100%:done"]),
            "freshrelease:FreshreleaseIssueChangelogItems:2:9:Fix%3A 100%25%3Adone"
        );
    }
}
