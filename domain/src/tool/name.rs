//! Tool name parsing
//!
//! Tool identifiers carry the namespace of the provider they belong to.
//! Two formats are accepted:
//!
//! | Format | Example | Result |
//! |--------|---------|--------|
//! | Namespaced | `notion__getTasks` | namespace `notion`, tool `getTasks` |
//! | Legacy | `notion_getTasks` | namespace `notion`, tool `getTasks`, `is_legacy` |
//!
//! The namespaced form always takes precedence: a name containing `__` is
//! never interpreted as legacy, even when it also starts with `<provider>_`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between namespace and tool name.
pub const NAMESPACE_SEPARATOR: &str = "__";

/// Separator used by the legacy `<provider>_<tool>` convention.
pub const LEGACY_SEPARATOR: char = '_';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseToolNameError {
    #[error("missing namespace for tool {raw_name}")]
    MissingNamespace { raw_name: String },
}

/// A tool identifier split into namespace and bare tool name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedToolName {
    pub namespace: Option<String>,
    pub tool_name: String,
    pub is_legacy: bool,
}

impl ParsedToolName {
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

/// Normalize a provider identifier into a namespace (trimmed, lowercase).
pub fn normalize_namespace(provider: &str) -> String {
    provider.trim().to_lowercase()
}

/// Parse `raw_name` in the context of `provider`.
///
/// Only the namespace comparison is case-insensitive; the tool name keeps its
/// casing exactly.
pub fn parse_tool_name(raw_name: &str, provider: &str) -> Result<ParsedToolName, ParseToolNameError> {
    let missing = || ParseToolNameError::MissingNamespace {
        raw_name: raw_name.to_string(),
    };

    if let Some((namespace, tool_name)) = raw_name.split_once(NAMESPACE_SEPARATOR) {
        let namespace = normalize_namespace(namespace);
        if namespace.is_empty() || tool_name.is_empty() {
            return Err(missing());
        }
        return Ok(ParsedToolName {
            namespace: Some(namespace),
            tool_name: tool_name.to_string(),
            is_legacy: false,
        });
    }

    let provider_namespace = normalize_namespace(provider);
    if provider_namespace.is_empty() {
        return Err(missing());
    }

    let legacy_prefix = format!("{provider_namespace}{LEGACY_SEPARATOR}");
    match raw_name.strip_prefix(&legacy_prefix) {
        Some(rest) if !rest.is_empty() => Ok(ParsedToolName {
            namespace: Some(provider_namespace),
            tool_name: rest.to_string(),
            is_legacy: true,
        }),
        _ => Err(missing()),
    }
}

/// Build the canonical namespaced identifier for a tool.
pub fn qualified_tool_name(namespace: &str, tool_name: &str) -> String {
    format!(
        "{}{}{}",
        normalize_namespace(namespace),
        NAMESPACE_SEPARATOR,
        tool_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(raw: &str, provider: &str) -> ParsedToolName {
        parse_tool_name(raw, provider).unwrap()
    }

    #[test]
    fn test_namespaced_name() {
        let parsed = parse_ok("notion__getTasks", "notion");
        assert_eq!(parsed.namespace(), Some("notion"));
        assert_eq!(parsed.tool_name, "getTasks");
        assert!(!parsed.is_legacy);
    }

    #[test]
    fn test_namespaced_name_is_exact_for_any_parts() {
        for (ns, tool) in [("p", "t"), ("github", "list_pull_requests"), ("slack", "Post")] {
            let parsed = parse_ok(&format!("{ns}__{tool}"), ns);
            assert_eq!(parsed.namespace(), Some(ns));
            assert_eq!(parsed.tool_name, tool);
            assert!(!parsed.is_legacy);
        }
    }

    #[test]
    fn test_splits_on_first_separator_only() {
        let parsed = parse_ok("notion__get__tasks", "notion");
        assert_eq!(parsed.namespace(), Some("notion"));
        assert_eq!(parsed.tool_name, "get__tasks");
    }

    #[test]
    fn test_empty_halves_are_missing_namespace() {
        for raw in ["__getTasks", "notion__", "__", "__x", "x__"] {
            assert_eq!(
                parse_tool_name(raw, "notion"),
                Err(ParseToolNameError::MissingNamespace {
                    raw_name: raw.to_string()
                }),
                "{raw} should fail"
            );
        }
    }

    #[test]
    fn test_legacy_name() {
        let parsed = parse_ok("notion_getTasks", "notion");
        assert_eq!(parsed.namespace(), Some("notion"));
        assert_eq!(parsed.tool_name, "getTasks");
        assert!(parsed.is_legacy);
    }

    #[test]
    fn test_legacy_remainder_is_verbatim() {
        let parsed = parse_ok("notion_get_tasks_by_status", "notion");
        assert_eq!(parsed.tool_name, "get_tasks_by_status");
        assert!(parsed.is_legacy);
    }

    #[test]
    fn test_double_underscore_wins_over_legacy_prefix() {
        let parsed = parse_ok("notion_search__pages", "notion");
        assert_eq!(parsed.namespace(), Some("notion_search"));
        assert_eq!(parsed.tool_name, "pages");
        assert!(!parsed.is_legacy);
    }

    #[test]
    fn test_provider_is_normalized() {
        let parsed = parse_ok("notion_getTasks", "  NoTion ");
        assert_eq!(parsed.namespace(), Some("notion"));
        assert!(parsed.is_legacy);

        let parsed = parse_ok("Notion__getTasks", "notion");
        assert_eq!(parsed.namespace(), Some("notion"));
        assert_eq!(parsed.tool_name, "getTasks");
    }

    #[test]
    fn test_unrecognized_names_fail() {
        assert!(parse_tool_name("getTasks", "notion").is_err());
        assert!(parse_tool_name("linear_createIssue", "notion").is_err());
        assert!(parse_tool_name("notion_", "notion").is_err());
        assert!(parse_tool_name("", "notion").is_err());
        assert!(parse_tool_name("_getTasks", "  ").is_err());
    }

    #[test]
    fn test_tool_name_casing_is_preserved() {
        let parsed = parse_ok("notion__GetTASKS", "NOTION");
        assert_eq!(parsed.tool_name, "GetTASKS");
    }

    #[test]
    fn test_qualified_tool_name() {
        assert_eq!(qualified_tool_name(" Linear", "createIssue"), "linear__createIssue");
    }
}
