// src/parser.rs

/// Character cursor shared by the path tokenizer and the return-expression parser.
pub struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    pub fn parse_identifier(&mut self) -> Option<&'a str> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c == '_' || c.is_ascii_alphanumeric() {
                self.i += 1;
            } else {
                break;
            }
        }
        if self.i == start {
            None
        } else {
            Some(&self.s[start..self.i])
        }
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Take the next character, advancing past it.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.i += c.len_utf8();
        Some(c)
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
    }

    /// Unconsumed input.
    pub fn rest(&self) -> &'a str {
        &self.s[self.i..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_multibyte_input() {
        let mut p = Parser::new("é.x");
        assert_eq!(p.bump(), Some('é'));
        assert!(p.consume_char('.'));
        assert_eq!(p.rest(), "x");
        assert_eq!(p.bump(), Some('x'));
        assert_eq!(p.bump(), None);
    }

    #[test]
    fn identifiers_stop_at_punctuation() {
        let mut p = Parser::new("substring_1_3 (x)");
        assert_eq!(p.parse_identifier(), Some("substring_1_3"));
        p.skip_ws();
        assert!(p.consume_char('('));
        assert_eq!(p.parse_identifier(), Some("x"));
    }
}
