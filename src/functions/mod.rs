use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use crate::errors::{EvalError, Result};

/// Trait for aggregate functions that terminate a path, e.g. `length()`.
///
/// `call` receives the elements of a non-empty list, or the values of a non-empty map.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;
    fn call(&self, elements: &[&Value]) -> Result<Value>;
}

/// Thread-safe function registry.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<&'static str, Arc<dyn Function>>>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    pub fn with_builtins() -> Self {
        let mut map: HashMap<&'static str, Arc<dyn Function>> = HashMap::new();
        map.insert("length", Arc::new(builtins::Length));
        map.insert("max", Arc::new(builtins::Max));
        map.insert("min", Arc::new(builtins::Min));
        map.insert("sum", Arc::new(builtins::Sum));
        map.insert("avg", Arc::new(builtins::Avg));
        Self { inner: Arc::new(map) }
    }

    pub fn register<F: Function + 'static>(&mut self, f: F) {
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.insert(f.name(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.inner.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.inner.keys().collect();
        names.sort();
        f.debug_struct("Registry").field("functions", &names).finish()
    }
}

/// Split a path segment like `length()` or `max ( )` into its function name.
pub fn function_name(segment: &str) -> Option<&str> {
    let compact = segment.trim_end();
    let open = compact.find('(')?;
    let rest: String = compact[open..].chars().filter(|c| !c.is_whitespace()).collect();
    if rest == "()" {
        Some(compact[..open].trim())
    } else {
        None
    }
}

/// Apply function `name` to a list, or to the values of a map.
///
/// Empty collections yield `Null` rather than a zero, so missing data is never
/// reported as a measured `0`.
pub fn evaluate(registry: &Registry, name: &str, node: &Value) -> Result<Value> {
    let elements: Vec<&Value> = match node {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        other => {
            return Err(EvalError::function(
                name,
                format!("functions are allowed only on collections and maps, found {other}"),
            ))
        }
    };
    let function = registry
        .get(name)
        .ok_or_else(|| EvalError::Config(format!("unknown function {name}()")))?;
    if elements.is_empty() {
        return Ok(Value::Null);
    }
    function.call(&elements)
}

pub mod builtins {
    use super::*;
    use crate::comparison::natural_cmp;
    use std::cmp::Ordering;

    pub struct Length;
    impl Function for Length {
        fn name(&self) -> &'static str { "length" }
        fn call(&self, elements: &[&Value]) -> Result<Value> {
            Ok(Value::from(elements.len()))
        }
    }

    pub struct Max;
    impl Function for Max {
        fn name(&self) -> &'static str { "max" }
        fn call(&self, elements: &[&Value]) -> Result<Value> {
            extreme(self.name(), elements, Ordering::Greater)
        }
    }

    pub struct Min;
    impl Function for Min {
        fn name(&self) -> &'static str { "min" }
        fn call(&self, elements: &[&Value]) -> Result<Value> {
            extreme(self.name(), elements, Ordering::Less)
        }
    }

    pub struct Sum;
    impl Function for Sum {
        fn name(&self) -> &'static str { "sum" }
        fn call(&self, elements: &[&Value]) -> Result<Value> {
            Ok(Value::from(sum(self.name(), elements)?))
        }
    }

    pub struct Avg;
    impl Function for Avg {
        fn name(&self) -> &'static str { "avg" }
        fn call(&self, elements: &[&Value]) -> Result<Value> {
            Ok(Value::from(sum(self.name(), elements)? / elements.len() as f64))
        }
    }

    fn extreme(name: &str, elements: &[&Value], wanted: Ordering) -> Result<Value> {
        let Some((&first, rest)) = elements.split_first() else {
            return Ok(Value::Null);
        };
        let mut best = first;
        for candidate in rest {
            match natural_cmp(candidate, best) {
                Some(ord) if ord == wanted => best = *candidate,
                Some(_) => {}
                None => {
                    return Err(EvalError::function(
                        name,
                        format!("elements {best} and {candidate} are not comparable"),
                    ))
                }
            }
        }
        Ok(best.clone())
    }

    fn sum(name: &str, elements: &[&Value]) -> Result<f64> {
        elements.iter().try_fold(0f64, |acc, e| match e.as_f64() {
            Some(n) => Ok(acc + n),
            None => Err(EvalError::function(
                name,
                format!("found element which is not a number: {e}"),
            )),
        })
    }
}
