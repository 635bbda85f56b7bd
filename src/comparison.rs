use serde_json::Value;
use std::cmp::Ordering;

/// Natural ordering between two values of the same kind.
///
/// Numbers compare numerically, strings lexically, booleans false < true.
/// Anything else (mixed kinds, null, containers) has no ordering.
pub fn natural_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(sa), Value::String(sb)) => Some(sa.cmp(sb)),
        (Value::Number(na), Value::Number(nb)) => {
            if let (Some(ia), Some(ib)) = (na.as_i64(), nb.as_i64()) {
                Some(ia.cmp(&ib))
            } else if let (Some(ua), Some(ub)) = (na.as_u64(), nb.as_u64()) {
                Some(ua.cmp(&ub))
            } else {
                na.as_f64()?.partial_cmp(&nb.as_f64()?)
            }
        }
        (Value::Bool(ba), Value::Bool(bb)) => Some(ba.cmp(bb)),
        _ => None,
    }
}

/// Textual form of a value as used in filter equality and attribute bindings.
///
/// Strings are taken verbatim; everything else uses its JSON rendering, so
/// `true` is `"true"` and `1.5` is `"1.5"`.
pub fn to_plain_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
