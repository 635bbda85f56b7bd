//! Path expression grammar: `$.key.${placeholder}[0][1:3][?(@.a=b && @.c=${c})].fn()`.
//!
//! A path is tokenized once into a [`NodeSequence`]; the matcher then switches on
//! node variants instead of re-inspecting strings during traversal.

use tracing::warn;

use crate::cache::ParseCache;
use crate::errors::{EvalError, Result};
use crate::filter::{self, FilterClause};
use crate::functions::{function_name, Registry};
use crate::parser::Parser;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Map key, with escape markers already removed.
    Literal(String),
    /// `${name}`: every key of a map or position of a list, bound under `name`.
    Placeholder(String),
    /// Empty segment before a bracket (`$.[0]`): stay on the current list.
    ListPassthrough,
    /// `name()`: aggregate over the current list or map.
    Function(String),
    Array(ArraySelector),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArraySelector {
    Index(usize),
    /// Half-open `[from, to)`.
    Range { from: usize, to: usize },
    /// `?(...)`: elements satisfying every clause.
    FilterAll(Vec<FilterClause>),
}

pub type NodeSequence = Vec<Node>;

/// Segment spelling of the empty map key.
pub const EMPTY_KEY: &str = "''";

/// Characters of the segment being read, each flagged when it came from a `\` escape.
#[derive(Default)]
struct Segment {
    chars: Vec<(char, bool)>,
}

impl Segment {
    fn push(&mut self, c: char, escaped: bool) {
        self.chars.push((c, escaped));
    }
}

/// Tokenizer settings plus the collaborators it validates against.
pub(crate) struct PathParser<'a> {
    pub cache: &'a ParseCache,
    pub registry: &'a Registry,
    pub strict_escapes: bool,
}

impl PathParser<'_> {
    /// Parse a full path expression. It must start with `$`; `$` alone selects the root.
    pub fn parse_path(&self, path: &str) -> Result<NodeSequence> {
        let body = trim_path_end(path.trim_start())
            .strip_prefix('$')
            .ok_or_else(|| EvalError::Parse(format!("path should start with $: {path}")))?;
        self.tokenize(body.trim_start())
    }

    /// Split the part after `$` into nodes.
    ///
    /// `.` separates segments outside brackets and `\` makes the next character
    /// literal. A bracket closes at a `]` followed by `.`, `[` or the end of input.
    /// Escaped characters never start a placeholder or function and are not trimmed.
    pub fn tokenize(&self, body: &str) -> Result<NodeSequence> {
        let mut p = Parser::new(body);
        let mut nodes = Vec::new();
        let mut segment = Segment::default();

        while let Some(c) = p.bump() {
            match c {
                '\\' => match p.bump() {
                    Some(escaped) => segment.push(escaped, true),
                    None => segment.push(self.dangling_escape(body)?, false),
                },
                '.' => {
                    self.flush_segment(&mut segment, &mut nodes)?;
                    if p.peek_char() == Some('[') {
                        nodes.push(Node::ListPassthrough);
                    }
                }
                '[' => {
                    self.flush_segment(&mut segment, &mut nodes)?;
                    let content = self.bracket_content(&mut p, body)?;
                    nodes.push(self.bracket_node(&content)?);
                }
                other => segment.push(other, false),
            }
        }
        self.flush_segment(&mut segment, &mut nodes)?;
        Ok(nodes)
    }

    fn bracket_content(&self, p: &mut Parser<'_>, body: &str) -> Result<String> {
        let mut content = String::new();
        loop {
            match p.bump() {
                None => {
                    return Err(EvalError::Parse(format!(
                        "unterminated bracket expression in {body}"
                    )))
                }
                Some('\\') => match p.bump() {
                    Some(escaped) => content.push(escaped),
                    None => content.push(self.dangling_escape(body)?),
                },
                Some(']') if matches!(p.peek_char(), None | Some('.') | Some('[')) => {
                    return Ok(content)
                }
                Some(c) => content.push(c),
            }
        }
    }

    /// The backslash to keep for a lone trailing `\`, unless escapes are strict.
    fn dangling_escape(&self, body: &str) -> Result<char> {
        if self.strict_escapes {
            return Err(EvalError::Parse(format!(
                "trailing escape character at end of {body}"
            )));
        }
        warn!("ignoring trailing escape character at end of path {body}");
        Ok('\\')
    }

    fn flush_segment(&self, segment: &mut Segment, nodes: &mut NodeSequence) -> Result<()> {
        let chars = std::mem::take(&mut segment.chars);
        let blank = |&(c, escaped): &(char, bool)| !escaped && c.is_whitespace();
        let start = chars.iter().position(|c| !blank(c)).unwrap_or(chars.len());
        let end = chars.iter().rposition(|c| !blank(c)).map_or(start, |last| last + 1);
        let chars = &chars[start..end];
        let Some(&(_, first_escaped)) = chars.first() else {
            return Ok(());
        };
        let name: String = chars.iter().map(|&(c, _)| c).collect();
        let escaped = |wanted: &[char]| chars.iter().any(|(c, e)| *e && wanted.contains(c));

        let node = if name == EMPTY_KEY && !escaped(&['\'']) {
            Node::Literal(String::new())
        } else if let Some(inner) = placeholder_name(&name).filter(|_| !first_escaped) {
            Node::Placeholder(named_placeholder(inner, &name)?)
        } else if let Some(function) = function_name(&name).filter(|_| !escaped(&['(', ')'])) {
            Node::Function(self.known_function(function)?)
        } else {
            Node::Literal(name)
        };
        nodes.push(node);
        Ok(())
    }

    /// `[${name}]` walks list positions like `.${name}`; anything else is a selector.
    fn bracket_node(&self, content: &str) -> Result<Node> {
        match placeholder_name(content.trim()) {
            Some(inner) => Ok(Node::Placeholder(named_placeholder(inner, content)?)),
            None => self.array_selector(content).map(Node::Array),
        }
    }

    fn array_selector(&self, content: &str) -> Result<ArraySelector> {
        let content = content.trim();
        if content == "*" {
            return Err(EvalError::Config(
                "ambiguous wildcard array expression [*] not supported".into(),
            ));
        }
        if let Some(body) = content.strip_prefix("?(") {
            let body = body.strip_suffix(')').ok_or_else(|| {
                EvalError::Parse(format!("filter expression is missing its closing ')': {content}"))
            })?;
            return filter::parse_clauses(body, self).map(ArraySelector::FilterAll);
        }
        if let Some((from, to)) = content.split_once(':') {
            let (from, to) = (from.trim(), to.trim());
            if to.is_empty() {
                return Err(EvalError::Config(format!(
                    "array expression 'from tail' not supported: {content}"
                )));
            }
            let from = if from.is_empty() { 0 } else { parse_position(from, content)? };
            let to = parse_position(to, content)?;
            return Ok(ArraySelector::Range { from, to });
        }
        parse_position(content, content).map(ArraySelector::Index)
    }

    /// Check a function name against the registry.
    pub fn known_function(&self, name: &str) -> Result<String> {
        if self.registry.contains(name) {
            Ok(name.to_string())
        } else {
            Err(EvalError::Config(format!("unknown function {name}()")))
        }
    }
}

/// `${name}` -> `name`.
pub(crate) fn placeholder_name(segment: &str) -> Option<&str> {
    segment
        .strip_prefix("${")
        .and_then(|s| s.strip_suffix('}'))
        .map(str::trim)
}

fn named_placeholder(inner: &str, segment: &str) -> Result<String> {
    if inner.is_empty() {
        return Err(EvalError::Config(format!("placeholder without a name: {segment}")));
    }
    Ok(inner.to_string())
}

/// Trim trailing whitespace, keeping a whitespace character that is escaped.
fn trim_path_end(path: &str) -> &str {
    let trimmed = path.trim_end();
    let backslashes = trimmed.chars().rev().take_while(|&c| c == '\\').count();
    if backslashes % 2 == 0 {
        return trimmed;
    }
    let kept = path[trimmed.len()..].chars().next().map_or(0, char::len_utf8);
    &path[..trimmed.len() + kept]
}

fn parse_position(text: &str, expression: &str) -> Result<usize> {
    text.parse::<usize>().map_err(|_| {
        EvalError::Config(format!(
            "expected position in array as a non-negative integer, found '{text}' in [{expression}]"
        ))
    })
}

/// Escape a key so it reads back as a single literal segment.
///
/// Separators and brackets are escaped, as are `$`, parentheses and whitespace at
/// either end, so the segment never parses as a placeholder or a function or gets
/// trimmed. The empty key is spelled [`EMPTY_KEY`].
pub fn escape_key(key: &str) -> String {
    if key.is_empty() {
        return EMPTY_KEY.to_string();
    }
    let last = key.chars().count() - 1;
    let mut out = String::with_capacity(key.len() + 2);
    for (idx, c) in key.chars().enumerate() {
        let at_edge = idx == 0 || idx == last;
        if matches!(c, '\\' | '.' | '[' | ']' | '$' | '(' | ')')
            || (at_edge && c.is_whitespace())
            || (idx == 0 && key == EMPTY_KEY)
        {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
