//! Extract values and their structural context from JSON-like documents.
//!
//! ```
//! use json_path_extract::Engine;
//! use serde_json::json;
//!
//! let engine = Engine::new();
//! let doc = json!({"items": [{"id": "a", "value": 1}, {"id": "b", "value": 2}]});
//! let found = engine.find_matching_paths(&doc, "$.items[?(@.id=${id})].value").unwrap();
//! assert_eq!(found[1].full_object_path, "$.items[?(@.id=b)].value");
//! assert_eq!(found[1].path_attributes["id"], "b");
//! ```

pub mod errors;
pub mod context;
pub mod engine;
pub mod functions;
pub mod expression;
pub mod jsonpath;
pub mod filter;
pub mod matcher;
mod cache;
mod comparison;
mod parser;

pub use cache::ParseCache;
pub use context::{AttributeContext, Scope};
pub use engine::{distinct, Engine, EngineOptions};
pub use errors::{EvalError, Result};
pub use expression::{parse_return_expr, ReturnExpr};
pub use filter::{FilterClause, ValueSpec};
pub use functions::{Function, Registry};
pub use jsonpath::{ArraySelector, Node, NodeSequence};
pub use matcher::MatchingPath;
