// src/expression.rs
use crate::comparison::to_plain_string;
use crate::errors::{EvalError, Result};
use crate::matcher::MatchingPath;
use crate::parser::Parser;
use serde_json::Value;

/// Reduces a match set to one value.
///
/// Textual forms: empty (the matched object), `pathTags:<name>`, `valueOfKey:<key>`,
/// `countMatches`, `substring_<from>[_<to>](<inner>)`.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnExpr {
    Matched,
    PathTag(String),
    ValueOfKey(String),
    CountMatches,
    Substring { from: usize, to: Option<usize>, inner: Box<ReturnExpr> },
}

pub fn parse_return_expr(input: &str) -> Result<ReturnExpr> {
    let expr = input.trim();
    if expr.is_empty() {
        return Ok(ReturnExpr::Matched);
    }
    if let Some(name) = expr.strip_prefix("pathTags:") {
        return Ok(ReturnExpr::PathTag(name.trim().to_string()));
    }
    if let Some(key) = expr.strip_prefix("valueOfKey:") {
        return Ok(ReturnExpr::ValueOfKey(key.trim().to_string()));
    }
    if expr.eq_ignore_ascii_case("countMatches") {
        return Ok(ReturnExpr::CountMatches);
    }
    if expr.starts_with("substring_") {
        return parse_substring(expr);
    }
    Err(EvalError::Config(format!("unsupported return expression: {expr}")))
}

fn parse_substring(expr: &str) -> Result<ReturnExpr> {
    let bad = || EvalError::Config(format!("bad substring expression: {expr}"));
    let mut p = Parser::new(expr);
    let name = p.parse_identifier().ok_or_else(bad)?;
    p.skip_ws();
    if !p.consume_char('(') {
        return Err(bad());
    }
    let inner = p.rest().trim_end().strip_suffix(')').ok_or_else(bad)?;

    let bounds = name.strip_prefix("substring_").ok_or_else(bad)?;
    let parse = |s: &str| s.trim().parse::<usize>().map_err(|_| bad());
    let (from, to) = match bounds.split_once('_') {
        Some((from, to)) => (parse(from)?, Some(parse(to)?)),
        None => (parse(bounds)?, None),
    };
    Ok(ReturnExpr::Substring { from, to, inner: Box::new(parse_return_expr(inner)?) })
}

impl ReturnExpr {
    /// Only `countMatches` makes sense over several matches.
    pub fn accepts_many(&self) -> bool {
        matches!(self, ReturnExpr::CountMatches)
    }

    pub fn evaluate(&self, matches: &[MatchingPath]) -> Result<Value> {
        if matches.len() > 1 && !self.accepts_many() {
            return Err(EvalError::Runtime(format!(
                "found {} matching paths where only 1 should match",
                matches.len()
            )));
        }
        self.apply(matches)
    }

    fn apply(&self, matches: &[MatchingPath]) -> Result<Value> {
        if let ReturnExpr::CountMatches = self {
            return Ok(Value::from(matches.len()));
        }
        let Some(first) = matches.first() else {
            return Ok(Value::Null);
        };
        match self {
            ReturnExpr::Matched => Ok(first.matched_object.clone()),
            ReturnExpr::PathTag(name) => Ok(first
                .path_attributes
                .get(name)
                .map(|v| Value::String(v.clone()))
                .unwrap_or(Value::Null)),
            ReturnExpr::ValueOfKey(key) => match &first.matched_object {
                Value::Object(map) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
                other => Err(EvalError::Runtime(format!(
                    "can't return valueOfKey:{key} for {other}"
                ))),
            },
            ReturnExpr::Substring { from, to, inner } => {
                let value = inner.apply(matches)?;
                if value.is_null() {
                    return Ok(Value::Null);
                }
                let text = to_plain_string(&value);
                let chars: Vec<char> = text.chars().collect();
                let end = to.unwrap_or(chars.len());
                if *from > end || end > chars.len() {
                    return Err(EvalError::Runtime(format!(
                        "can't take substring [{from}, {end}) of '{text}'"
                    )));
                }
                Ok(Value::String(chars[*from..end].iter().collect()))
            }
            ReturnExpr::CountMatches => Ok(Value::from(matches.len())),
        }
    }
}
