//! SQF text to [`Value`] parsing.
//!
//! Grammar:
//!
//! ```text
//! value   := bool | number | string | array
//! bool    := "true" | "false"              (case-insensitive)
//! number  := integer | double              (double has '.' or an exponent)
//! string  := '"' ( char | '""' )* '"'      (also '...' with '' escaping)
//! array   := '[' ( value ( ',' value )* )? ']'
//! ```
//!
//! Whitespace between tokens is skipped. Integers that fit in 32 bits parse
//! as [`Value::Int32`], larger ones as [`Value::Int64`].

use core::iter::Peekable;
use core::str::{CharIndices, FromStr};

use crate::error::{ParseError, ParseErrorKind};
use crate::value::Value;

/// Parse a complete SQF value from `text`.
///
/// # Errors
///
/// Returns [`ParseError`] with the byte offset of the first problem if the
/// text is not exactly one well-formed value.
pub fn parse(text: &str) -> Result<Value, ParseError> {
    let mut parser = Parser::new(text);
    let value = parser.value()?;
    parser.skip_whitespace();
    match parser.peek() {
        Some((offset, _)) => Err(ParseError::new(offset, ParseErrorKind::TrailingInput)),
        None => Ok(value),
    }
}

impl FromStr for Value {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

struct Parser<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().peekable(),
        }
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    /// Offset of the next unread character, or the end of input.
    fn position(&mut self) -> usize {
        self.peek().map_or(self.text.len(), |(offset, _)| offset)
    }

    fn end_error(&self) -> ParseError {
        ParseError::new(self.text.len(), ParseErrorKind::UnexpectedEnd)
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(self.end_error()),
            Some((_, '[')) => self.array(),
            Some((_, quote @ ('"' | '\''))) => self.string(quote),
            Some((start, c)) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => {
                self.number(start)
            }
            Some((start, c)) if c.is_ascii_alphabetic() => self.word(start),
            Some((offset, c)) => Err(ParseError::new(offset, ParseErrorKind::UnexpectedChar(c))),
        }
    }

    fn array(&mut self) -> Result<Value, ParseError> {
        self.chars.next();
        let mut items = Vec::new();

        self.skip_whitespace();
        if self.chars.next_if(|(_, c)| *c == ']').is_some() {
            return Ok(Value::Array(items));
        }

        loop {
            items.push(self.value()?);
            self.skip_whitespace();
            match self.chars.next() {
                Some((_, ',')) => {}
                Some((_, ']')) => return Ok(Value::Array(items)),
                Some((offset, c)) => {
                    return Err(ParseError::new(offset, ParseErrorKind::UnexpectedChar(c)));
                }
                None => return Err(self.end_error()),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<Value, ParseError> {
        self.chars.next();
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(self.end_error()),
                Some((_, c)) if c == quote => {
                    // A doubled quote is an escaped quote, a single one ends the string.
                    if self.chars.next_if(|(_, next)| *next == quote).is_some() {
                        out.push(quote);
                    } else {
                        return Ok(Value::String(out));
                    }
                }
                Some((_, c)) => out.push(c),
            }
        }
    }

    fn number(&mut self, start: usize) -> Result<Value, ParseError> {
        while self
            .chars
            .next_if(|(_, c)| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
            .is_some()
        {}
        let end = self.position();
        let literal = self.text.get(start..end).unwrap_or_default();
        let invalid = || ParseError::new(start, ParseErrorKind::InvalidNumber(literal.to_owned()));

        if literal.contains(['.', 'e', 'E']) {
            return literal.parse::<f64>().map(Value::Double).ok().ok_or_else(invalid);
        }

        let n = literal.parse::<i64>().ok().ok_or_else(invalid)?;
        Ok(i32::try_from(n).map_or(Value::Int64(n), Value::Int32))
    }

    fn word(&mut self, start: usize) -> Result<Value, ParseError> {
        while self
            .chars
            .next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
            .is_some()
        {}
        let end = self.position();
        let word = self.text.get(start..end).unwrap_or_default();

        if word.eq_ignore_ascii_case("true") {
            Ok(Value::Bool(true))
        } else if word.eq_ignore_ascii_case("false") {
            Ok(Value::Bool(false))
        } else {
            Err(ParseError::new(start, ParseErrorKind::UnknownLiteral(word.to_owned())))
        }
    }
}
