//! Structured validation failures.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Key under which [`ValidationError::format`] stores messages at each level.
pub const ERRORS_KEY: &str = "_errors";

/// One reason a field was rejected.
///
/// `path` locates the offending value inside the field: `["foo"]` for
/// `body.foo`, `[]` for the field as a whole.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Issue {
    pub path: Vec<String>,
    pub message: String,
}

impl Issue {
    pub fn new(path: Vec<String>, message: impl Into<String>) -> Self {
        Self { path, message: message.into() }
    }

    /// An issue about the field as a whole.
    pub fn root(message: impl Into<String>) -> Self {
        Self::new(Vec::new(), message)
    }
}

/// Why a schema rejected a field. Never empty.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ValidationError {
    issues: Vec<Issue>,
}

impl ValidationError {
    pub fn new(issue: Issue) -> Self {
        Self { issues: vec![issue] }
    }

    /// Adds another issue.
    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Nests every message under its path, each level keeping its own
    /// messages in an `_errors` array:
    ///
    /// ```rust
    /// use serde_json::json;
    /// use tsu_fields::{Issue, ValidationError};
    ///
    /// let mut err = ValidationError::new(Issue::root("bad shape"));
    /// err.push(Issue::new(vec!["user".into(), "age".into()], "expected a number"));
    ///
    /// assert_eq!(err.format(), json!({
    ///     "_errors": ["bad shape"],
    ///     "user": { "_errors": [], "age": { "_errors": ["expected a number"] } },
    /// }));
    /// ```
    pub fn format(&self) -> Value {
        let mut root = Node::default();
        for issue in &self.issues {
            let mut node = &mut root;
            for segment in &issue.path {
                node = node.children.entry(segment.clone()).or_default();
            }
            node.errors.push(issue.message.clone());
        }
        root.into_value()
    }
}

#[derive(Default)]
struct Node {
    errors: Vec<String>,
    children: BTreeMap<String, Node>,
}

impl Node {
    fn into_value(self) -> Value {
        let mut map: Map<String, Value> = self.children
            .into_iter()
            .map(|(key, child)| (key, child.into_value()))
            .collect();
        // A level's own messages win over a child literally named `_errors`.
        map.insert(
            ERRORS_KEY.to_owned(),
            Value::Array(self.errors.into_iter().map(Value::String).collect()),
        );
        Value::Object(map)
    }
}

impl From<Issue> for ValidationError {
    fn from(issue: Issue) -> Self {
        Self::new(issue)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            if issue.path.is_empty() {
                f.write_str(&issue.message)?;
            } else {
                write!(f, "{}: {}", issue.path.join("."), issue.message)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_merges_shared_prefixes() {
        let mut err = ValidationError::new(Issue::new(vec!["a".into(), "b".into()], "one"));
        err.push(Issue::new(vec!["a".into(), "c".into()], "two"));
        err.push(Issue::new(vec!["a".into()], "three"));

        assert_eq!(
            err.format(),
            json!({
                "_errors": [],
                "a": {
                    "_errors": ["three"],
                    "b": { "_errors": ["one"] },
                    "c": { "_errors": ["two"] },
                },
            }),
        );
    }

    #[test]
    fn display_joins_paths() {
        let mut err = ValidationError::new(Issue::root("missing field `foo`"));
        err.push(Issue::new(vec!["x-count".into()], "invalid digit"));
        assert_eq!(err.to_string(), "missing field `foo`; x-count: invalid digit");
    }

    #[test]
    fn serializes_as_issue_list() {
        let err = ValidationError::new(Issue::new(vec!["foo".into()], "nope"));
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "issues": [{ "path": ["foo"], "message": "nope" }] }),
        );
    }
}
