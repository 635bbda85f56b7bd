use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{trace, warn};

use crate::cache::ParseCache;
use crate::context::AttributeContext;
use crate::filter::{FilterClause, ValueSpec};
use crate::functions::{self, Registry};
use crate::jsonpath::{escape_key, ArraySelector, Node};

/// One fully resolved match of a path expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingPath {
    /// Concrete path of the match, e.g. `$.nodes.n1.jvm` or `$.items[?(@.id=a)]`.
    pub full_object_path: String,
    /// Placeholder bindings in effect when the match was reached.
    pub path_attributes: BTreeMap<String, String>,
    pub matched_object: Value,
}

/// Depth-first walk of a tree driven by a parsed node sequence.
pub(crate) struct Matcher<'e> {
    nodes: &'e [Node],
    cache: &'e ParseCache,
    registry: &'e Registry,
}

impl<'e> Matcher<'e> {
    pub fn new(nodes: &'e [Node], cache: &'e ParseCache, registry: &'e Registry) -> Self {
        Self { nodes, cache, registry }
    }

    /// Match `nodes[i..]` against `tree`, appending every completed match to `out`.
    ///
    /// Shape mismatches end the branch without an error; the same path is expected
    /// to be re-run against documents whose shape changes over time.
    pub fn traverse(
        &self,
        path_so_far: &str,
        tree: &Value,
        i: usize,
        ctx: &mut AttributeContext,
        out: &mut Vec<MatchingPath>,
    ) {
        if tree.is_null() {
            return;
        }
        let Some(node) = self.nodes.get(i) else {
            out.push(MatchingPath {
                full_object_path: path_so_far.to_string(),
                path_attributes: ctx.snapshot(),
                matched_object: tree.clone(),
            });
            return;
        };

        match (node, tree) {
            (Node::Literal(name), Value::Object(map)) => {
                if let Some(child) = map.get(name) {
                    let path = format!("{path_so_far}.{}", escape_key(name));
                    self.traverse(&path, child, i + 1, ctx, out);
                }
            }
            (Node::Placeholder(name), Value::Object(map)) => {
                for (key, child) in map {
                    let mut scope = ctx.scope();
                    scope.bind(name, key.as_str());
                    let path = format!("{path_so_far}.{}", escape_key(key));
                    self.traverse(&path, child, i + 1, &mut scope, out);
                }
            }
            (Node::Placeholder(name), Value::Array(items)) => {
                for (k, child) in items.iter().enumerate() {
                    let mut scope = ctx.scope();
                    scope.bind(name, k.to_string());
                    let path = format!("{path_so_far}[{k}]");
                    self.traverse(&path, child, i + 1, &mut scope, out);
                }
            }
            (Node::ListPassthrough, Value::Array(_)) => {
                self.traverse(path_so_far, tree, i + 1, ctx, out);
            }
            (Node::Function(name), _) => match functions::evaluate(self.registry, name, tree) {
                Ok(result) => {
                    let path = format!("{path_so_far}.{name}()");
                    self.traverse(&path, &result, i + 1, ctx, out);
                }
                Err(err) => warn!("{name}() at {path_so_far} failed: {err}"),
            },
            (Node::Array(selector), Value::Array(items)) => {
                self.step_into_list(selector, path_so_far, items, i, ctx, out);
            }
            (Node::Array(_), _) => {
                warn!("expected to find a list at {path_so_far}, instead found {tree}");
            }
            (node, _) => trace!("{node:?} does not apply at {path_so_far}"),
        }
    }

    fn step_into_list(
        &self,
        selector: &ArraySelector,
        path_so_far: &str,
        items: &[Value],
        i: usize,
        ctx: &mut AttributeContext,
        out: &mut Vec<MatchingPath>,
    ) {
        match selector {
            ArraySelector::Index(idx) => match items.get(*idx) {
                Some(child) => {
                    self.traverse(&format!("{path_so_far}[{idx}]"), child, i + 1, ctx, out);
                }
                None => warn!(
                    "tried to extract element at position {idx} while there are only {} elements; path so far was {path_so_far}",
                    items.len()
                ),
            },
            ArraySelector::Range { from, to } => {
                let end = (*to).min(items.len());
                for k in *from..end {
                    self.traverse(&format!("{path_so_far}[{k}]"), &items[k], i + 1, ctx, out);
                }
            }
            ArraySelector::FilterAll(clauses) => {
                for element in items {
                    let Some(resolved) = self.resolve_clauses(clauses, element) else {
                        continue;
                    };
                    let mut scope = ctx.scope();
                    let mut rendered = Vec::with_capacity(clauses.len());
                    for (clause, value) in clauses.iter().zip(&resolved) {
                        if let ValueSpec::PlaceholderBind(name) = &clause.value {
                            scope.bind(name, value.as_str());
                        }
                        rendered.push(clause.render(value));
                    }
                    let path = format!("{path_so_far}[?({})]", rendered.join(" && "));
                    self.traverse(&path, element, i + 1, &mut scope, out);
                }
            }
        }
    }

    /// Values of every clause for `element`, or `None` as soon as one fails.
    fn resolve_clauses(&self, clauses: &[FilterClause], element: &Value) -> Option<Vec<String>> {
        clauses
            .iter()
            .map(|clause| clause.resolve(element, self.cache, self.registry))
            .collect()
    }
}
