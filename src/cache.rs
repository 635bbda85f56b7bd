//! Memoization of path tokenization and clause splitting.
//!
//! Entries are computed on first use of an expression string and kept for the
//! lifetime of the owning engine. Two callers racing on the same key may both
//! compute it; the results are identical, so whichever insert lands is kept.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::errors::Result;
use crate::jsonpath::NodeSequence;

#[derive(Debug, Default)]
pub struct ParseCache {
    nodes: DashMap<String, Arc<NodeSequence>>,
    splits: DashMap<(&'static str, String), Arc<[String]>>,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached node sequence for `path`, parsing it with `parse` on a miss.
    ///
    /// Failed parses are not cached; they abort whatever depends on the path.
    pub fn nodes_or_parse<F>(&self, path: &str, parse: F) -> Result<Arc<NodeSequence>>
    where
        F: FnOnce(&str) -> Result<NodeSequence>,
    {
        if let Some(hit) = self.nodes.get(path) {
            return Ok(Arc::clone(hit.value()));
        }
        debug!("parsing path expression {path}");
        let parsed = Arc::new(parse(path)?);
        let entry = self.nodes.entry(path.to_string()).or_insert(parsed);
        Ok(Arc::clone(entry.value()))
    }

    /// `text` split on every occurrence of `separator`, cached per pair.
    pub fn split(&self, text: &str, separator: &'static str) -> Arc<[String]> {
        let key = (separator, text.to_string());
        if let Some(hit) = self.splits.get(&key) {
            return Arc::clone(hit.value());
        }
        let parts: Arc<[String]> = text.split(separator).map(str::to_string).collect();
        let entry = self.splits.entry(key).or_insert(parts);
        Arc::clone(entry.value())
    }

    /// Number of distinct path expressions parsed so far.
    pub fn parsed_paths(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct (text, separator) splits cached so far.
    pub fn cached_splits(&self) -> usize {
        self.splits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_computed_once_per_key() {
        let cache = ParseCache::new();
        let a = cache.split("up||degraded", "||");
        let b = cache.split("up||degraded", "||");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(&*a, &["up".to_string(), "degraded".to_string()]);
        cache.split("up||degraded", ".");
        assert_eq!(cache.cached_splits(), 2);
    }

    #[test]
    fn failed_parse_is_not_cached() {
        let cache = ParseCache::new();
        let res = cache.nodes_or_parse("$.a[*]", |_| {
            Err(crate::errors::EvalError::Config("nope".into()))
        });
        assert!(res.is_err());
        assert_eq!(cache.parsed_paths(), 0);
    }
}
