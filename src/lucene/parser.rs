//! Recursive descent parser for the Lucene query subset.
//!
//! Precedence, loosest first: `OR`, then `AND` (explicit or implicit
//! adjacency), then the prefix operators `NOT`/`!`, `-`, `+`. Keywords are
//! case sensitive, as in Lucene, so `and` is an ordinary term.

use super::ast::{Node, Range};
use crate::error::SearchError;

/// Deepest nesting of parentheses and prefix operators accepted before the
/// query is rejected. Also caps chained `^` modifiers on one operand.
pub(crate) const MAX_NESTING: usize = 64;

/// Parses `input` into a syntax tree.
pub fn parse(input: &str) -> Result<Node, SearchError> {
    Parser::new(input).parse()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn parse(mut self) -> Result<Node, SearchError> {
        self.skip_ws();
        if self.eof() {
            return Err(self.error("Query cannot be empty"));
        }
        let node = self.parse_or()?;
        self.skip_ws();
        if let Some(ch) = self.peek_char() {
            return Err(self.error(format!("Unexpected '{}'", ch)));
        }
        Ok(node)
    }

    fn parse_or(&mut self) -> Result<Node, SearchError> {
        let mut parts = vec![self.parse_and()?];
        loop {
            self.skip_ws();
            if self.consume_symbol("||") || self.consume_keyword("OR") {
                parts.push(self.parse_and()?);
            } else {
                break;
            }
        }
        Ok(collapse(parts, Node::Or))
    }

    fn parse_and(&mut self) -> Result<Node, SearchError> {
        let mut parts = vec![self.parse_unary()?];
        loop {
            self.skip_ws();
            if self.consume_symbol("&&") || self.consume_keyword("AND") || self.starts_operand() {
                parts.push(self.parse_unary()?);
            } else {
                break;
            }
        }
        Ok(collapse(parts, Node::And))
    }

    fn parse_unary(&mut self) -> Result<Node, SearchError> {
        self.skip_ws();
        if self.consume_keyword("NOT") || self.consume_symbol("!") {
            return self.parse_prefixed(Node::Not);
        }
        if self.consume_symbol("-") {
            return self.parse_prefixed(Node::Prohibit);
        }
        if self.consume_symbol("+") {
            return self.parse_prefixed(Node::Plus);
        }
        let primary = self.parse_primary()?;
        self.parse_modifiers(primary)
    }

    fn parse_prefixed(&mut self, wrap: fn(Box<Node>) -> Node) -> Result<Node, SearchError> {
        self.enter()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(wrap(Box::new(operand)))
    }

    fn enter(&mut self) -> Result<(), SearchError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("Query is nested too deeply"));
        }
        Ok(())
    }

    fn parse_primary(&mut self) -> Result<Node, SearchError> {
        match self.peek_char() {
            Some('(') => Ok(Node::Group(Box::new(self.parse_group()?))),
            Some('"') | Some('/') | Some('[') | Some('{') => self.parse_leaf(),
            Some(ch) if is_term_breaker(ch) => Err(self.error(format!("Unexpected '{}'", ch))),
            Some(_) => {
                let start = self.pos;
                let word = self.read_word()?;
                if self.peek_char() == Some(':') {
                    self.advance_char();
                    let expr = self.parse_field_value()?;
                    return Ok(Node::SearchField {
                        name: word,
                        expr: Box::new(expr),
                    });
                }
                if is_keyword(&word) {
                    self.pos = start;
                    return Err(self.error(format!("Unexpected keyword '{}'", word)));
                }
                Ok(Node::Word(word))
            }
            None => Err(self.error("Unexpected end of query")),
        }
    }

    fn parse_field_value(&mut self) -> Result<Node, SearchError> {
        self.skip_ws();
        let value = match self.peek_char() {
            Some('(') => Node::FieldGroup(Box::new(self.parse_group()?)),
            Some(ch) if is_term_breaker(ch) && !matches!(ch, '"' | '[' | '{') => {
                return Err(self.error(format!("Unexpected '{}' after field name", ch)));
            }
            Some(_) => self.parse_leaf()?,
            None => return Err(self.error("Missing value after field name")),
        };
        self.parse_modifiers(value)
    }

    fn parse_leaf(&mut self) -> Result<Node, SearchError> {
        match self.peek_char() {
            Some('"') => Ok(Node::Phrase(self.read_phrase()?)),
            Some('/') => Ok(Node::Regex(self.read_regex()?)),
            Some('[') | Some('{') => Ok(Node::Range(self.parse_range()?)),
            _ => {
                let start = self.pos;
                let word = self.read_word()?;
                if is_keyword(&word) {
                    self.pos = start;
                    return Err(self.error(format!("Unexpected keyword '{}'", word)));
                }
                Ok(Node::Word(word))
            }
        }
    }

    fn parse_group(&mut self) -> Result<Node, SearchError> {
        let open = self.pos;
        self.advance_char();
        self.enter()?;
        self.skip_ws();
        if self.peek_char() == Some(')') {
            return Err(self.error("Empty group"));
        }
        let inner = self.parse_or()?;
        self.skip_ws();
        if self.peek_char() != Some(')') {
            self.pos = open;
            return Err(self.error("Missing closing parenthesis"));
        }
        self.advance_char();
        self.depth -= 1;
        Ok(inner)
    }

    fn parse_range(&mut self) -> Result<Range, SearchError> {
        let include_low = self.peek_char() == Some('[');
        self.advance_char();
        self.skip_ws();
        let low = self.read_endpoint()?;
        self.skip_ws();
        if !self.consume_keyword("TO") {
            return Err(self.error("Expected 'TO' in range"));
        }
        self.skip_ws();
        let high = self.read_endpoint()?;
        self.skip_ws();
        let include_high = match self.peek_char() {
            Some(']') => true,
            Some('}') => false,
            _ => return Err(self.error("Expected ']' or '}' to close range")),
        };
        self.advance_char();
        Ok(Range {
            low,
            high,
            include_low,
            include_high,
        })
    }

    fn parse_modifiers(&mut self, mut node: Node) -> Result<Node, SearchError> {
        let mut boosts = 0;
        loop {
            match self.peek_char() {
                Some('~') => {
                    self.advance_char();
                    let degree = self.read_number();
                    let degree = (!degree.is_empty()).then_some(degree);
                    node = match node {
                        Node::Word(term) => Node::Fuzzy { term, degree },
                        Node::Phrase(phrase) => Node::Proximity { phrase, degree },
                        _ => return Err(self.error("'~' must follow a term or a phrase")),
                    };
                }
                Some('^') => {
                    self.advance_char();
                    let force = self.read_number();
                    if force.is_empty() {
                        return Err(self.error("'^' must be followed by a number"));
                    }
                    boosts += 1;
                    if boosts > MAX_NESTING {
                        return Err(self.error("Query is nested too deeply"));
                    }
                    node = Node::Boost {
                        expr: Box::new(node),
                        force,
                    };
                }
                _ => return Ok(node),
            }
        }
    }

    fn read_endpoint(&mut self) -> Result<String, SearchError> {
        if self.peek_char() == Some('"') {
            let phrase = self.read_phrase()?;
            return Ok(phrase[1..phrase.len() - 1].to_string());
        }
        self.read_word()
    }

    // Escape sequences are kept verbatim; they are resolved during value
    // normalization, after wildcard substitution.
    fn read_word(&mut self) -> Result<String, SearchError> {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch == '\\' {
                self.advance_char();
                if self.eof() {
                    return Err(self.error("Dangling escape character"));
                }
                self.advance_char();
                continue;
            }
            if ch.is_whitespace() || is_term_breaker(ch) {
                break;
            }
            self.advance_char();
        }
        if start == self.pos {
            return Err(self.error("Expected a term"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn read_phrase(&mut self) -> Result<String, SearchError> {
        let start = self.pos;
        self.read_delimited('"', "Missing closing quote")?;
        Ok(self.input[start..self.pos].to_string())
    }

    fn read_regex(&mut self) -> Result<String, SearchError> {
        let start = self.pos;
        self.read_delimited('/', "Missing closing '/' for regex")?;
        Ok(self.input[start + 1..self.pos - 1].to_string())
    }

    fn read_delimited(&mut self, delimiter: char, unterminated: &str) -> Result<(), SearchError> {
        let start = self.pos;
        self.advance_char();
        while let Some(ch) = self.peek_char() {
            self.advance_char();
            if ch == '\\' {
                self.advance_char();
            } else if ch == delimiter {
                return Ok(());
            }
        }
        self.pos = start;
        Err(self.error(unterminated))
    }

    fn read_number(&mut self) -> String {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() || ch == '.' {
                self.advance_char();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn starts_operand(&self) -> bool {
        match self.peek_char() {
            None | Some(')') => false,
            Some(_) => !self.remaining().starts_with("||") && !self.at_keyword("OR"),
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        let rest = self.remaining();
        if !rest.starts_with(keyword) {
            return false;
        }
        match rest[keyword.len()..].chars().next() {
            None => true,
            Some(next) => next.is_whitespace() || next == '(' || next == '"',
        }
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn consume_symbol(&mut self, symbol: &str) -> bool {
        if self.remaining().starts_with(symbol) {
            self.pos += symbol.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while let Some(ch) = self.peek_char() {
            if !ch.is_whitespace() {
                break;
            }
            self.advance_char();
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance_char(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn error(&self, message: impl Into<String>) -> SearchError {
        let offset = self.input[..self.pos].chars().count();
        SearchError::Parse {
            message: format!("{} (at character {})", message.into(), offset),
            offset: Some(offset),
        }
    }
}

fn collapse(mut parts: Vec<Node>, combine: fn(Vec<Node>) -> Node) -> Node {
    if parts.len() == 1 {
        parts.remove(0)
    } else {
        combine(parts)
    }
}

fn is_term_breaker(ch: char) -> bool {
    matches!(ch, '(' | ')' | '[' | ']' | '{' | '}' | ':' | '"' | '^' | '~')
}

fn is_keyword(word: &str) -> bool {
    matches!(word, "AND" | "OR" | "NOT" | "TO")
}
