use std::borrow::Cow;
use std::sync::Arc;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::ParseCache;
use crate::context::AttributeContext;
use crate::errors::{EvalError, Result};
use crate::expression::ReturnExpr;
use crate::filter;
use crate::functions::{self, Registry};
use crate::jsonpath::{NodeSequence, PathParser};
use crate::matcher::{Matcher, MatchingPath};

// =========================
// Options
// =========================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Reject a path ending in a lone `\` instead of keeping the backslash literally.
    pub strict_escapes: bool,
}

// =========================
// Engine
// =========================

/// Path matching engine. Owns its parse cache, so one instance can be shared by
/// every thread evaluating paths; attribute contexts stay per call.
#[derive(Debug)]
pub struct Engine {
    options: EngineOptions,
    registry: Registry,
    cache: ParseCache,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self::with_registry(options, Registry::with_builtins())
    }

    /// Engine whose paths may use the functions in `registry`.
    pub fn with_registry(options: EngineOptions, registry: Registry) -> Self {
        Self { options, registry, cache: ParseCache::new() }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> &ParseCache {
        &self.cache
    }

    /// Parse `path` into nodes, once per distinct path string.
    pub fn parse(&self, path: &str) -> Result<Arc<NodeSequence>> {
        let parser = PathParser {
            cache: &self.cache,
            registry: &self.registry,
            strict_escapes: self.options.strict_escapes,
        };
        self.cache.nodes_or_parse(path, |p| parser.parse_path(p))
    }

    /// Every node of `tree` selected by `path`.
    pub fn find_matching_paths(&self, tree: &Value, path: &str) -> Result<Vec<MatchingPath>> {
        let mut ctx = AttributeContext::new();
        self.find_matching_paths_with(tree, path, &mut ctx)
    }

    /// Like [`Engine::find_matching_paths`], starting from caller-provided bindings.
    ///
    /// `ctx` is back in its original state when this returns.
    pub fn find_matching_paths_with(
        &self,
        tree: &Value,
        path: &str,
        ctx: &mut AttributeContext,
    ) -> Result<Vec<MatchingPath>> {
        let nodes = self.parse(path)?;
        if is_empty_document(tree) {
            debug!("empty document, no matches for {path}");
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        Matcher::new(&nodes, &self.cache, &self.registry).traverse("$", tree, 0, ctx, &mut out);
        debug!("{} matching paths for {path}", out.len());
        Ok(out)
    }

    /// Matches of `path` with duplicate resolved paths removed.
    pub fn find_distinct_matching_paths(&self, tree: &Value, path: &str) -> Result<Vec<MatchingPath>> {
        Ok(distinct(self.find_matching_paths(tree, path)?))
    }

    /// Evaluate a dotted expression (`a.b`, `a.values.sum()`) against one node.
    pub fn find_value_in<'a>(&self, expression: &str, node: &'a Value) -> Result<Option<Cow<'a, Value>>> {
        filter::find_value_in(expression, node, &self.cache, &self.registry)
    }

    /// Apply one aggregate function to a list or map.
    pub fn evaluate_function(&self, name: &str, node: &Value) -> Result<Value> {
        functions::evaluate(&self.registry, name, node)
    }

    /// Read `attribute` from the single object selected by `path`.
    ///
    /// The attribute is looked up as a field name and, when it contains a `.`, also
    /// as an expression; both producing a value is an error. Several matches are
    /// discarded with a warning.
    pub fn read_attribute(&self, tree: &Value, path: &str, attribute: &str) -> Result<Option<Value>> {
        let matches = self.find_matching_paths(tree, path)?;
        let matched = match matches.as_slice() {
            [] => return Ok(None),
            [single] => &single.matched_object,
            _ => {
                warn!(
                    "multiple matches found for attribute {attribute} for path {path}, discarding all matches"
                );
                return Ok(None);
            }
        };
        let Value::Object(map) = matched else {
            return Err(EvalError::Runtime(format!(
                "expected to match an object with path {path}, instead found {matched}"
            )));
        };
        let by_name = map.get(attribute).filter(|v| !v.is_null());
        if !attribute.contains('.') {
            return Ok(by_name.cloned());
        }
        let by_expression = self.find_value_in(attribute, matched)?;
        match (by_name, by_expression) {
            (Some(field), Some(expr)) => Err(EvalError::Runtime(format!(
                "for attribute/expression {attribute} found ambiguous result, both field ({field}) and expression ({}) produce a value",
                expr
            ))),
            (Some(field), None) => Ok(Some(field.clone())),
            (None, expr) => Ok(expr.map(Cow::into_owned)),
        }
    }

    /// Match `path` and reduce the matches with a return expression.
    pub fn extract(&self, tree: &Value, path: &str, ret: &ReturnExpr) -> Result<Value> {
        let matches = self.find_matching_paths(tree, path)?;
        ret.evaluate(&matches)
    }
}

fn is_empty_document(tree: &Value) -> bool {
    match tree {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Keep the first match per resolved path, in the original order.
pub fn distinct(matches: Vec<MatchingPath>) -> Vec<MatchingPath> {
    matches
        .into_iter()
        .unique_by(|m| m.full_object_path.clone())
        .collect()
}
