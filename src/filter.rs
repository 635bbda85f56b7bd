use std::borrow::Cow;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::cache::ParseCache;
use crate::comparison::to_plain_string;
use crate::errors::{EvalError, Result};
use crate::functions::{self, function_name, Registry};
use crate::jsonpath::{placeholder_name, PathParser};

/// One `@.subpath=value` condition of a `?(...)` selector.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub path: String,
    pub value: ValueSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueSpec {
    /// Literal text, possibly `a||b` alternatives; `raw` is kept for resolved paths.
    Literal { raw: String, alternatives: Arc<[String]> },
    /// `${name}`: any non-null value, bound under `name`.
    PlaceholderBind(String),
}

/// Parse the inside of `?( ... )` into AND-ed clauses.
pub(crate) fn parse_clauses(body: &str, parser: &PathParser<'_>) -> Result<Vec<FilterClause>> {
    if !body.trim_start().starts_with("@.") {
        return Err(EvalError::Config(format!(
            "filter clauses must start with '@.': ?({body})"
        )));
    }
    let mut clauses = Vec::new();
    for piece in parser.cache.split(body, "@.").iter() {
        let mut expression = piece.trim();
        if let Some(stripped) = expression.strip_suffix("&&") {
            expression = stripped.trim_end();
        }
        if expression.is_empty() {
            continue;
        }
        clauses.push(parse_clause(expression, parser)?);
    }
    if clauses.is_empty() {
        return Err(EvalError::Config(format!("filter without clauses: ?({body})")));
    }
    Ok(clauses)
}

fn parse_clause(expression: &str, parser: &PathParser<'_>) -> Result<FilterClause> {
    let (path, value) = expression
        .split_once('=')
        .ok_or_else(|| EvalError::Parse(format!("filter clause without '=': @.{expression}")))?;
    let (path, value) = (path.trim(), value.trim());
    if path.is_empty() {
        return Err(EvalError::Parse(format!("filter clause without a path: @.{expression}")));
    }

    let segments = parser.cache.split(path, ".");
    for (idx, segment) in segments.iter().enumerate() {
        if let Some(name) = function_name(segment) {
            if idx + 1 != segments.len() {
                return Err(EvalError::Config(format!(
                    "function should be the last node in the expression: {path}"
                )));
            }
            parser.known_function(name)?;
        }
    }

    let value = match placeholder_name(value) {
        Some(name) => ValueSpec::PlaceholderBind(name.to_string()),
        None => ValueSpec::Literal {
            raw: value.to_string(),
            alternatives: parser.cache.split(value, "||"),
        },
    };
    Ok(FilterClause { path: path.to_string(), value })
}

/// Evaluate a dotted expression such as `routing.node` or `pools.length()` against `node`.
///
/// Walks map keys segment by segment; a trailing `name()` aggregates over whatever
/// the walk reached. `Ok(None)` when a segment is missing or the walk hits a
/// non-map before the end.
pub fn find_value_in<'a>(
    expression: &str,
    node: &'a Value,
    cache: &ParseCache,
    registry: &Registry,
) -> Result<Option<Cow<'a, Value>>> {
    let segments = cache.split(expression, ".");
    let mut current = Cow::Borrowed(node);
    for (idx, segment) in segments.iter().enumerate() {
        if current.is_null() {
            return Ok(None);
        }
        let segment = segment.trim();
        if let Some(name) = function_name(segment) {
            if idx + 1 != segments.len() {
                return Err(EvalError::Config(format!(
                    "function should be the last node in the expression: {expression}"
                )));
            }
            current = Cow::Owned(functions::evaluate(registry, name, &current)?);
            continue;
        }
        current = match current {
            Cow::Borrowed(Value::Object(map)) => match map.get(segment) {
                Some(child) => Cow::Borrowed(child),
                None => return Ok(None),
            },
            Cow::Owned(Value::Object(mut map)) => match map.remove(segment) {
                Some(child) => Cow::Owned(child),
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
    }
    if current.is_null() {
        Ok(None)
    } else {
        Ok(Some(current))
    }
}

impl FilterClause {
    /// Textual value of this clause for `element`, if the clause holds.
    ///
    /// Evaluation errors only fail this element; they are logged, not returned.
    pub(crate) fn resolve(
        &self,
        element: &Value,
        cache: &ParseCache,
        registry: &Registry,
    ) -> Option<String> {
        let found = match find_value_in(&self.path, element, cache, registry) {
            Ok(found) => found?,
            Err(err) => {
                warn!("filter clause @.{} could not be evaluated: {err}", self.path);
                return None;
            }
        };
        let actual = to_plain_string(&found);
        match &self.value {
            ValueSpec::PlaceholderBind(_) => Some(actual),
            ValueSpec::Literal { alternatives, .. } => alternatives
                .iter()
                .any(|alt| alt.trim() == actual)
                .then_some(actual),
        }
    }

    /// `@.path=value` as it appears in a resolved path.
    pub(crate) fn render(&self, resolved: &str) -> String {
        match &self.value {
            ValueSpec::Literal { raw, .. } => format!("@.{}={raw}", self.path),
            ValueSpec::PlaceholderBind(_) => format!("@.{}={resolved}", self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn clauses(body: &str) -> Result<Vec<FilterClause>> {
        let cache = ParseCache::new();
        let registry = Registry::with_builtins();
        let parser = PathParser { cache: &cache, registry: &registry, strict_escapes: false };
        parse_clauses(body, &parser)
    }

    #[test]
    fn splits_anded_clauses() {
        let parsed = clauses("@.node=${nodeId} && @.primary=true && @.state=STARTED||RELOCATING").unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].path, "node");
        assert_eq!(parsed[0].value, ValueSpec::PlaceholderBind("nodeId".into()));
        let ValueSpec::Literal { raw, alternatives } = &parsed[2].value else {
            panic!("expected literal clause");
        };
        assert_eq!(raw, "STARTED||RELOCATING");
        assert_eq!(alternatives.len(), 2);
    }

    #[test]
    fn rejects_malformed_clauses() {
        assert!(matches!(clauses("@.node"), Err(EvalError::Parse(_))));
        assert!(matches!(clauses("node=1"), Err(EvalError::Config(_))));
        assert!(matches!(clauses("@.a.length().b=1"), Err(EvalError::Config(_))));
        assert!(matches!(clauses("@.a.nope()=1"), Err(EvalError::Config(_))));
    }

    #[test]
    fn find_value_walks_maps() {
        let cache = ParseCache::new();
        let registry = Registry::with_builtins();
        let doc = json!({"routing": {"node": "n1", "sizes": [1, 2, 3]}});
        let found = find_value_in("routing.node", &doc, &cache, &registry).unwrap();
        assert_eq!(found.as_deref(), Some(&json!("n1")));
        let sum = find_value_in("routing.sizes.sum()", &doc, &cache, &registry).unwrap();
        assert_eq!(sum.as_deref(), Some(&json!(6.0)));
        assert_eq!(find_value_in("routing.node.x", &doc, &cache, &registry).unwrap(), None);
        assert_eq!(find_value_in("missing.node", &doc, &cache, &registry).unwrap(), None);
    }

    #[test]
    fn find_value_rejects_function_in_the_middle() {
        let cache = ParseCache::new();
        let registry = Registry::with_builtins();
        let doc = json!({"a": [1]});
        let err = find_value_in("a.length().b", &doc, &cache, &registry).unwrap_err();
        assert!(matches!(err, EvalError::Config(_)));
    }

    #[test]
    fn literal_alternatives_match_exactly() {
        let cache = ParseCache::new();
        let registry = Registry::with_builtins();
        let parsed = clauses("@.status=up||degraded").unwrap();
        let clause = &parsed[0];
        assert_eq!(clause.resolve(&json!({"status": "up"}), &cache, &registry), Some("up".into()));
        assert_eq!(
            clause.resolve(&json!({"status": "degraded"}), &cache, &registry),
            Some("degraded".into())
        );
        assert_eq!(clause.resolve(&json!({"status": "upx"}), &cache, &registry), None);
        assert_eq!(clause.resolve(&json!({"state": "up"}), &cache, &registry), None);
    }
}
