//! Type and status mapping
//!
//! Issue types and statuses are mapped through the scope config in two
//! levels: the type's mapping block, then the status inside it. A miss at
//! either level, or an empty standard value, keeps the original string.

use crate::config::ScopeConfig;

/// Resolve `(standard_type, standard_status)` for an issue
pub fn resolve(config: &ScopeConfig, type_name: &str, status_name: &str) -> (String, String) {
    let Some(mapping) = config.type_mappings.get(type_name) else {
        return (type_name.to_string(), status_name.to_string());
    };

    let standard_type = non_empty_or(&mapping.standard_type, type_name);
    let standard_status = mapping
        .status_mappings
        .get(status_name)
        .map_or_else(
            || status_name.to_string(),
            |s| non_empty_or(&s.standard_status, status_name),
        );

    (standard_type, standard_status)
}

/// Resolve only the status of an issue type, as changelogs need
pub fn resolve_status(config: &ScopeConfig, type_name: &str, status_name: &str) -> String {
    resolve(config, type_name, status_name).1
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StatusMapping, TypeMapping};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn config() -> ScopeConfig {
        let mut config = ScopeConfig::default();
        let mut task = TypeMapping::default();
        task.status_mappings.insert(
            "done".to_string(),
            StatusMapping {
                standard_status: "Done".to_string(),
            },
        );
        task.status_mappings
            .insert("blocked".to_string(), StatusMapping::default());
        config.type_mappings.insert("Task".to_string(), task);

        let story = TypeMapping {
            standard_type: "REQUIREMENT".to_string(),
            ..TypeMapping::default()
        };
        config.type_mappings.insert("Story".to_string(), story);
        config
    }

    #[test_case("Task", "done", "Task", "Done" ; "mapped status, empty type keeps original")]
    #[test_case("Bug", "done", "Bug", "done" ; "unknown type")]
    #[test_case("Task", "open", "Task", "open" ; "unknown status")]
    #[test_case("Task", "blocked", "Task", "blocked" ; "empty standard status")]
    #[test_case("Story", "done", "REQUIREMENT", "done" ; "mapped type without statuses")]
    #[test_case("task", "done", "task", "done" ; "keys are case sensitive")]
    fn test_resolve(type_name: &str, status: &str, want_type: &str, want_status: &str) {
        assert_eq!(
            resolve(&config(), type_name, status),
            (want_type.to_string(), want_status.to_string())
        );
    }

    #[test]
    fn test_resolve_with_empty_config() {
        assert_eq!(
            resolve(&ScopeConfig::default(), "Epic", "Closed"),
            ("Epic".to_string(), "Closed".to_string())
        );
        assert_eq!(resolve_status(&config(), "Task", "done"), "Done");
    }
}
