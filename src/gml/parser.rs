//! Recursive-descent parser for the markup grammar.
//!
//! Spaces, tabs and carriage returns are interchangeable layout; newlines
//! terminate attribute lines and are otherwise layout too. All structure is
//! ASCII, so the scanner walks chars and slices at delimiter boundaries.

use crate::error::{ParseError, EXCERPT_LEN};

use super::{Attribute, Body, Config, Node};

/// Parse a complete document whose top level is a single tagged body.
pub fn parse(text: &str) -> Result<Body, ParseError> {
    let mut p = Parser::new(text);
    p.skip_layout();
    if !p.rest().starts_with('[') {
        return Err(p.err("'['"));
    }
    let body = p.body()?;
    p.skip_layout();
    if !p.at_end() {
        return Err(p.err("end of input"));
    }
    Ok(body)
}

/// Parse a document with any number of top-level bodies and attributes.
pub fn parse_config(text: &str) -> Result<Config, ParseError> {
    let mut p = Parser::new(text);
    let mut nodes = Vec::new();
    p.skip_layout();
    while !p.at_end() {
        if p.rest().starts_with("[/") {
            return Err(p.err("tag or attribute"));
        }
        if p.rest().starts_with('[') {
            nodes.push(Node::Body(p.body()?));
        } else {
            nodes.extend(p.attribute()?.into_iter().map(Node::Attribute));
        }
        p.skip_layout();
    }
    Ok(nodes)
}

/// Parse a lone attribute line. A key list (`a,b=c`) yields one attribute
/// per key, all sharing the value.
pub fn parse_attr(text: &str) -> Result<Vec<Attribute>, ParseError> {
    let mut p = Parser::new(text);
    p.skip_layout();
    let attrs = p.attribute()?;
    p.skip_layout();
    if !p.at_end() {
        return Err(p.err("end of input"));
    }
    Ok(attrs)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn mark(&self) -> (usize, usize, usize) {
        (self.pos, self.line, self.column)
    }

    fn rewind(&mut self, mark: (usize, usize, usize)) {
        self.pos = mark.0;
        self.line = mark.1;
        self.column = mark.2;
    }

    fn err(&self, expected: &'static str) -> ParseError {
        ParseError {
            line: self.line,
            column: self.column,
            expected,
            excerpt: self.rest().chars().take(EXCERPT_LEN).collect(),
        }
    }

    fn expect(&mut self, c: char, expected: &'static str) -> Result<(), ParseError> {
        if self.peek() == Some(c) {
            self.advance();
            Ok(())
        } else {
            Err(self.err(expected))
        }
    }

    /// Skip spaces, tabs and carriage returns.
    fn skip_inline(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
            self.advance();
        }
    }

    /// Skip all layout, newlines included.
    fn skip_layout(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.advance();
        }
    }

    fn ident(&mut self, expected: &'static str) -> Result<String, ParseError> {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return Err(self.err(expected)),
        }
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn body(&mut self) -> Result<Body, ParseError> {
        self.expect('[', "'['")?;
        if self.peek() == Some('+') {
            // merge marker: the modifier semantics live in the consumer, the
            // stored name is the plain tag
            self.advance();
        }
        let name = self.ident("tag name")?;
        self.expect(']', "']'")?;

        let mut children = Vec::new();
        loop {
            self.skip_layout();
            if self.at_end() {
                return Err(self.err("closing tag"));
            }
            if self.rest().starts_with("[/") {
                self.advance();
                self.advance();
                let mark = self.mark();
                let close = self.ident("closing tag name")?;
                if close != name {
                    self.rewind(mark);
                    return Err(self.err("matching closing tag"));
                }
                self.expect(']', "']'")?;
                return Ok(Body { name, children });
            }
            if self.rest().starts_with('[') {
                children.push(Node::Body(self.body()?));
            } else {
                children.extend(self.attribute()?.into_iter().map(Node::Attribute));
            }
        }
    }

    fn attribute(&mut self) -> Result<Vec<Attribute>, ParseError> {
        let mut keys = vec![self.ident("attribute key")?];
        self.skip_inline();
        while self.peek() == Some(',') {
            self.advance();
            self.skip_inline();
            keys.push(self.ident("attribute key")?);
            self.skip_inline();
        }
        self.expect('=', "'='")?;
        let value = self.value()?;
        // value() stops at the line terminator; consume it
        if self.peek() == Some('\n') {
            self.advance();
        }
        Ok(keys
            .into_iter()
            .map(|key| Attribute { key, value: value.clone() })
            .collect())
    }

    fn value(&mut self) -> Result<String, ParseError> {
        self.skip_inline();

        // translatability marker: an underscore introducing a quoted segment
        // is dropped
        if self.peek() == Some('_') {
            let mark = self.mark();
            self.advance();
            self.skip_inline();
            if self.peek() != Some('"') && !self.rest().starts_with("<<") {
                self.rewind(mark);
            }
        }

        let mut out = String::new();
        loop {
            if self.rest().starts_with("<<") {
                self.advance();
                self.advance();
                let start = self.pos;
                while !self.at_end() && !self.rest().starts_with(">>") {
                    self.advance();
                }
                if self.at_end() {
                    return Err(self.err("'>>'"));
                }
                out.push_str(&self.src[start..self.pos]);
                self.advance();
                self.advance();
            } else if self.peek() == Some('"') {
                self.advance();
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == '"' {
                        break;
                    }
                    self.advance();
                }
                if self.at_end() {
                    return Err(self.err("'\"'"));
                }
                out.push_str(&self.src[start..self.pos]);
                self.advance();
            } else {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == '\n' || c == '"' || self.rest().starts_with("<<") {
                        break;
                    }
                    self.advance();
                }
                out.push_str(self.src[start..self.pos].trim_end_matches([' ', '\t', '\r']));
            }
            // a value runs to the end of the line; quoted segments may have
            // consumed newlines of their own already
            if matches!(self.peek(), None | Some('\n')) {
                break;
            }
        }
        Ok(out)
    }
}
