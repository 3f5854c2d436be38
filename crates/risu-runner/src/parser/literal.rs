//! Restricted evaluator for Python-style literal expressions.
//!
//! RISU prints plugin records as Python dictionaries, which are not valid
//! JSON once they use single quotes, `True` or `None`. This module rebuilds
//! such text into a [`serde_json::Value`] while accepting only literal
//! syntax: mappings, lists, tuples, strings, numbers, booleans and null.
//! Names, calls, operators (other than a sign on a number) and every other
//! expression form are rejected, so nothing from the tool's output is ever
//! executed.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Nesting depth beyond which input is rejected.
const MAX_DEPTH: usize = 64;

/// A literal that could not be reconstructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid literal at byte {offset}: {message}")]
pub struct LiteralError {
    offset: usize,
    message: String,
}

impl LiteralError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }

    /// Byte offset where parsing stopped.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

/// Parses `input` as a single literal expression.
///
/// # Errors
///
/// Returns a [`LiteralError`] when the input contains anything other than
/// one literal, optionally surrounded by whitespace.
///
/// # Example
///
/// ```
/// use risu_runner::parser::literal::parse_literal;
///
/// let value = parse_literal("{'plugin': '/a.sh', 'enabled': True, 'rc': None}")
///     .expect("literal parses");
/// assert_eq!(value["plugin"], "/a.sh");
/// assert_eq!(value["enabled"], true);
/// assert!(value["rc"].is_null());
/// ```
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = LiteralParser::new(input);
    let value = parser.value(0)?;
    parser.skip_whitespace();
    if parser.position < parser.bytes.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(value)
}

struct LiteralParser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    position: usize,
}

impl<'a> LiteralParser<'a> {
    const fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            position: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError::new(self.position, message)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.position).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
            self.position += 1;
        }
    }

    fn eat(&mut self, expected: u8) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(self.error("literal nested too deeply"));
        }
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') => self.mapping(depth),
            Some(b'[') => self.list(depth),
            Some(b'(') => self.tuple(depth),
            Some(b'\'' | b'"') => self.strings(),
            Some(b'-' | b'+' | b'.' | b'0'..=b'9') => self.number(),
            Some(byte) if byte.is_ascii_alphabetic() || byte == b'_' => self.word(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn mapping(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.position += 1;
        let mut map = Map::new();
        loop {
            if self.eat(b'}') {
                return Ok(Value::Object(map));
            }
            let key_offset = self.position;
            let key = mapping_key(self.value(depth + 1)?)
                .ok_or_else(|| LiteralError::new(key_offset, "unsupported mapping key"))?;
            if !self.eat(b':') {
                return Err(self.error("expected ':' after mapping key"));
            }
            let value = self.value(depth + 1)?;
            map.insert(key, value);
            if !self.eat(b',') {
                if self.eat(b'}') {
                    return Ok(Value::Object(map));
                }
                return Err(self.error("expected ',' or '}' in mapping"));
            }
        }
    }

    fn list(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.position += 1;
        let mut items = Vec::new();
        loop {
            if self.eat(b']') {
                return Ok(Value::Array(items));
            }
            items.push(self.value(depth + 1)?);
            if !self.eat(b',') {
                if self.eat(b']') {
                    return Ok(Value::Array(items));
                }
                return Err(self.error("expected ',' or ']' in list"));
            }
        }
    }

    /// Parses `( ... )`: a tuple, or a parenthesised single value.
    fn tuple(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.position += 1;
        if self.eat(b')') {
            return Ok(Value::Array(Vec::new()));
        }
        let first = self.value(depth + 1)?;
        if self.eat(b')') {
            return Ok(first);
        }
        if !self.eat(b',') {
            return Err(self.error("expected ',' or ')' in tuple"));
        }
        let mut items = vec![first];
        loop {
            if self.eat(b')') {
                return Ok(Value::Array(items));
            }
            items.push(self.value(depth + 1)?);
            if !self.eat(b',') {
                if self.eat(b')') {
                    return Ok(Value::Array(items));
                }
                return Err(self.error("expected ',' or ')' in tuple"));
            }
        }
    }

    /// Parses one or more adjacent string literals, concatenating them.
    fn strings(&mut self) -> Result<Value, LiteralError> {
        let mut text = self.string(false)?;
        loop {
            let checkpoint = self.position;
            self.skip_whitespace();
            match self.peek() {
                Some(b'\'' | b'"') => text.push_str(&self.string(false)?),
                _ => {
                    self.position = checkpoint;
                    return Ok(Value::String(text));
                }
            }
        }
    }

    fn string(&mut self, raw: bool) -> Result<String, LiteralError> {
        let Some(quote) = self.peek() else {
            return Err(self.error("expected string"));
        };
        let start = self.position;
        self.position += 1;
        let mut text = String::new();
        loop {
            let Some(ch) = self.source.get(self.position..).and_then(|rest| rest.chars().next())
            else {
                return Err(LiteralError::new(start, "unterminated string"));
            };
            self.position += ch.len_utf8();
            match ch {
                c if c == char::from(quote) => return Ok(text),
                '\n' => return Err(LiteralError::new(start, "unterminated string")),
                '\\' if raw => {
                    text.push('\\');
                    if let Some(next) = self.raw_escaped_quote(quote) {
                        text.push(next);
                    }
                }
                '\\' => self.escape(&mut text)?,
                other => text.push(other),
            }
        }
    }

    fn raw_escaped_quote(&mut self, quote: u8) -> Option<char> {
        if self.peek() == Some(quote) || self.peek() == Some(b'\\') {
            let next = self.peek().map(char::from);
            self.position += 1;
            next
        } else {
            None
        }
    }

    fn escape(&mut self, text: &mut String) -> Result<(), LiteralError> {
        let Some(ch) = self.source.get(self.position..).and_then(|rest| rest.chars().next())
        else {
            return Err(self.error("unterminated escape"));
        };
        self.position += ch.len_utf8();
        match ch {
            '\\' => text.push('\\'),
            '\'' => text.push('\''),
            '"' => text.push('"'),
            'n' => text.push('\n'),
            't' => text.push('\t'),
            'r' => text.push('\r'),
            '0' => text.push('\0'),
            'a' => text.push('\u{7}'),
            'b' => text.push('\u{8}'),
            'f' => text.push('\u{c}'),
            'v' => text.push('\u{b}'),
            '\n' => {}
            'x' => text.push(self.code_point(2)?),
            'u' => text.push(self.code_point(4)?),
            'U' => text.push(self.code_point(8)?),
            other => {
                text.push('\\');
                text.push(other);
            }
        }
        Ok(())
    }

    fn code_point(&mut self, digits: usize) -> Result<char, LiteralError> {
        let end = self.position + digits;
        let hex = self
            .source
            .get(self.position..end)
            .ok_or_else(|| self.error("truncated escape sequence"))?;
        let value =
            u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid escape sequence"))?;
        let ch = char::from_u32(value).ok_or_else(|| self.error("invalid code point"))?;
        self.position = end;
        Ok(ch)
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.position;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.position += 1;
            self.skip_whitespace();
        }
        let digits_start = self.position;
        while self
            .peek()
            .is_some_and(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_'))
            || (matches!(self.peek(), Some(b'-' | b'+'))
                && matches!(self.bytes.get(self.position.wrapping_sub(1)), Some(b'e' | b'E')))
        {
            self.position += 1;
        }

        let sign = self.source.get(start..digits_start).unwrap_or_default().trim();
        let body: String = self
            .source
            .get(digits_start..self.position)
            .unwrap_or_default()
            .chars()
            .filter(|ch| *ch != '_')
            .collect();
        if body.is_empty() {
            return Err(LiteralError::new(start, "expected number"));
        }
        let negative = sign == "-";

        if let Ok(integer) = body.parse::<i64>() {
            let signed = if negative { -integer } else { integer };
            return Ok(Value::Number(Number::from(signed)));
        }
        if !negative {
            if let Ok(integer) = body.parse::<u64>() {
                return Ok(Value::Number(Number::from(integer)));
            }
        }
        let is_decimal = body
            .chars()
            .all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | 'e' | 'E' | '+' | '-'));
        match body.parse::<f64>() {
            Ok(float) if is_decimal => {
                let signed = if negative { -float } else { float };
                Number::from_f64(signed)
                    .map(Value::Number)
                    .ok_or_else(|| LiteralError::new(start, "non-finite number"))
            }
            _ => Err(LiteralError::new(start, "invalid number")),
        }
    }

    /// Parses keywords and string prefixes such as `u'..'` or `r'..'`.
    fn word(&mut self) -> Result<Value, LiteralError> {
        let start = self.position;
        while self
            .peek()
            .is_some_and(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
        {
            self.position += 1;
        }
        let word = self.source.get(start..self.position).unwrap_or_default();

        if matches!(self.peek(), Some(b'\'' | b'"')) {
            return match word {
                "u" | "U" => self.strings(),
                "r" | "R" => self.string(true).map(Value::String),
                _ => Err(LiteralError::new(start, format!("unsupported string prefix '{word}'"))),
            };
        }

        match word {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => Err(LiteralError::new(start, format!("names are not literals: '{word}'"))),
        }
    }
}

/// Converts a parsed key into a JSON object key.
fn mapping_key(key: Value) -> Option<String> {
    match key {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(if flag { "True" } else { "False" }.to_owned()),
        Value::Null => Some(String::from("None")),
        Value::Array(_) | Value::Object(_) => None,
    }
}
