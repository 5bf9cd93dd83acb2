//! Remote link mining
//!
//! Remote link URLs are matched against the scope's repository patterns to
//! recover the commit they point at. Patterns are tried in order and the
//! first match wins; a separate SHA-only pattern may also be configured.

use crate::config::{CommitUrlPattern, ScopeConfig};
use crate::error::Result;
use regex::Regex;

/// Capture group names every repository pattern must expose
pub const REPO_GROUPS: [&str; 3] = ["namespace", "repo_name", "commit_sha"];

/// Commit coordinates recovered from a link URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCommit {
    /// URL host
    pub host: String,
    /// Owner path, may contain slashes on nested groups
    pub namespace: String,
    /// Repository name
    pub repo_name: String,
    /// 40 character commit SHA
    pub commit_sha: String,
    /// Repository URL rebuilt from the coordinates
    pub repo_url: String,
}

/// Compiled link patterns of one scope config
#[derive(Debug, Clone, Default)]
pub struct LinkMatcher {
    repo_patterns: Vec<Regex>,
    commit_sha: Option<Regex>,
}

impl LinkMatcher {
    /// Compile the patterns of a scope config
    pub fn new(config: &ScopeConfig) -> Result<Self> {
        let repo_patterns = config
            .remotelink_repo_pattern
            .iter()
            .filter_map(|p| source_of(p))
            .map(|source| Regex::new(&source))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let commit_sha = if config.remotelink_commit_sha_pattern.is_empty() {
            None
        } else {
            Some(Regex::new(&config.remotelink_commit_sha_pattern)?)
        };

        Ok(Self {
            repo_patterns,
            commit_sha,
        })
    }

    /// Whether any pattern is configured
    pub fn is_empty(&self) -> bool {
        self.repo_patterns.is_empty() && self.commit_sha.is_none()
    }

    /// First repository pattern that matches the URL
    pub fn match_repo(&self, url: &str) -> Option<RepoCommit> {
        self.repo_patterns.iter().find_map(|re| {
            let caps = re.captures(url)?;
            let group = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
            let namespace = group("namespace")?;
            let repo_name = group("repo_name")?;
            let commit_sha = group("commit_sha")?;
            let parsed = url::Url::parse(url).ok()?;
            let host = parsed.host_str()?.to_string();
            let repo_url = format!("{}://{host}/{namespace}/{repo_name}", parsed.scheme());
            Some(RepoCommit {
                host,
                namespace,
                repo_name,
                commit_sha,
                repo_url,
            })
        })
    }

    /// Commit SHA from the first group of the SHA pattern
    pub fn commit_sha(&self, url: &str) -> Option<String> {
        let caps = self.commit_sha.as_ref()?.captures(url)?;
        caps.get(1)
            .map(|m| m.as_str().to_string())
            .filter(|s| !s.is_empty())
    }
}

fn source_of(pattern: &CommitUrlPattern) -> Option<String> {
    if !pattern.regex.is_empty() {
        Some(pattern.regex.clone())
    } else if !pattern.pattern.is_empty() {
        Some(generate_regex(&pattern.pattern))
    } else {
        None
    }
}

/// Compile a URL template into a named-capture regex
///
/// Literal text is escaped; `{namespace}`, `{repo_name}` and `{commit_sha}`
/// become capture groups. Unknown placeholders stay literal.
pub fn generate_regex(template: &str) -> String {
    let mut out = String::from("^");
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&regex::escape(&rest[..start]));
        let after = &rest[start..];
        let Some(end) = after.find('}') else {
            rest = after;
            break;
        };
        let name = &after[1..end];
        match name {
            "namespace" => out.push_str("(?P<namespace>.+)"),
            "repo_name" => out.push_str("(?P<repo_name>[^/]+)"),
            "commit_sha" => out.push_str(r"(?P<commit_sha>\w{40})"),
            _ => out.push_str(&regex::escape(&after[..=end])),
        }
        rest = &after[end + 1..];
    }
    out.push_str(&regex::escape(rest));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SHA: &str = "8748a066cbaf67b15e86f2c636f9931347e987cf";

    fn scope(patterns: Vec<CommitUrlPattern>, sha: &str) -> ScopeConfig {
        ScopeConfig {
            remotelink_repo_pattern: patterns,
            remotelink_commit_sha_pattern: sha.to_string(),
            ..ScopeConfig::default()
        }
    }

    fn regex_pattern(regex: &str) -> CommitUrlPattern {
        CommitUrlPattern {
            pattern: String::new(),
            regex: regex.to_string(),
        }
    }

    #[test]
    fn test_github_pattern_extracts_coordinates() {
        let matcher = LinkMatcher::new(&scope(
            vec![regex_pattern(
                r"https://github.com/(?P<namespace>[^/]+)/(?P<repo_name>[^/]+)/commit/(?P<commit_sha>\w{40})",
            )],
            "",
        ))
        .unwrap();

        let found = matcher
            .match_repo(&format!("https://github.com/acme/widgets/commit/{SHA}"))
            .unwrap();
        assert_eq!(found.namespace, "acme");
        assert_eq!(found.repo_name, "widgets");
        assert_eq!(found.commit_sha, SHA);
        assert_eq!(found.host, "github.com");
        assert_eq!(found.repo_url, "https://github.com/acme/widgets");
    }

    #[test]
    fn test_first_match_wins() {
        let matcher = LinkMatcher::new(&scope(
            vec![
                regex_pattern(
                    r"https://gitlab.com/(?P<namespace>\S+)/(?P<repo_name>\S+)/-/commit/(?P<commit_sha>\w{40})",
                ),
                regex_pattern(
                    r"https://gitlab.com/(?P<namespace>[^/]+)/(?P<repo_name>[^/]+)/.*(?P<commit_sha>\w{40})",
                ),
            ],
            "",
        ))
        .unwrap();

        let found = matcher
            .match_repo(&format!("https://gitlab.com/group/sub/proj/-/commit/{SHA}"))
            .unwrap();
        assert_eq!(found.namespace, "group/sub");
        assert_eq!(found.repo_name, "proj");
    }

    #[test]
    fn test_no_match_is_none() {
        let matcher = LinkMatcher::new(&scope(
            vec![regex_pattern(
                r"https://github.com/(?P<namespace>[^/]+)/(?P<repo_name>[^/]+)/commit/(?P<commit_sha>\w{40})",
            )],
            "",
        ))
        .unwrap();
        assert!(matcher.match_repo("https://wiki.example.com/page/1").is_none());
        assert!(matcher.commit_sha("https://wiki.example.com/page/1").is_none());
    }

    #[test]
    fn test_commit_sha_uses_first_group() {
        let matcher = LinkMatcher::new(&scope(vec![], ".*/commit/(.*)")).unwrap();
        assert_eq!(
            matcher.commit_sha(&format!("https://git.example.com/x/commit/{SHA}")),
            Some(SHA.to_string())
        );
        assert!(matcher.match_repo("https://git.example.com/x/commit/abc").is_none());
    }

    #[test]
    fn test_template_pattern_is_compiled() {
        let template = "https://gitlab.com/{namespace}/{repo_name}/-/commit/{commit_sha}";
        let source = generate_regex(template);
        assert!(source.starts_with(r"^https://gitlab\.com/(?P<namespace>.+)/(?P<repo_name>[^/]+)/"));
        assert!(source.ends_with(r"/commit/(?P<commit_sha>\w{40})"));

        let matcher = LinkMatcher::new(&scope(
            vec![CommitUrlPattern {
                pattern: template.to_string(),
                regex: String::new(),
            }],
            "",
        ))
        .unwrap();
        let found = matcher
            .match_repo(&format!("https://gitlab.com/acme/tools/widgets/-/commit/{SHA}"))
            .unwrap();
        assert_eq!(found.namespace, "acme/tools");
        assert_eq!(found.repo_name, "widgets");
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let err = LinkMatcher::new(&scope(vec![regex_pattern("(?P<namespace>")], "")).unwrap_err();
        assert!(err.is_input_error());
        assert!(LinkMatcher::new(&scope(vec![], "[")).is_err());
    }

    #[test]
    fn test_empty_config() {
        let matcher = LinkMatcher::new(&ScopeConfig::default()).unwrap();
        assert!(matcher.is_empty());
    }
}
