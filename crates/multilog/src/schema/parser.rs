//! Parser for textual schema declarations.
//!
//! ```text
//! schema := '{' column (',' column)* '}'
//! column := key ':' type
//! key    := [A-Za-z_][A-Za-z0-9_]*
//! type   := [A-Za-z0-9()]+          e.g. INT, STRING(16)
//! ```
//!
//! Whitespace between tokens is ignored. Declaration order is preserved and
//! determines column order, hence byte offsets.

use crate::error::{ClientError, Result};
use crate::types::DataType;

/// Parses a textual schema declaration into `(name, type)` pairs in declaration order.
///
/// # Errors
///
/// Structural errors yield [`ClientError::SchemaError`]; bad type descriptors
/// yield [`ClientError::InvalidType`].
pub fn parse_schema_decl(text: &str) -> Result<Vec<(String, DataType)>> {
    let mut parser = DeclParser {
        input: text.as_bytes(),
        pos: 0,
    };

    parser.expect(b'{')?;
    let mut columns = Vec::new();
    loop {
        let name = parser.key()?;
        parser.expect(b':')?;
        let dtype = parser.type_token()?.parse::<DataType>()?;
        columns.push((name, dtype));

        parser.skip_whitespace();
        match parser.bump() {
            Some(b',') => continue,
            Some(b'}') => break,
            Some(c) => {
                return Err(parser.error(&format!("expected ',' or '}}', found {:?}", c as char)))
            }
            None => return Err(parser.error("unterminated schema, expected '}'")),
        }
    }

    parser.skip_whitespace();
    if parser.pos != parser.input.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(columns)
}

struct DeclParser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl DeclParser<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        self.skip_whitespace();
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(&format!(
                "expected {:?}, found {:?}",
                expected as char, c as char
            ))),
            None => Err(self.error(&format!("expected {:?}, found end of input", expected as char))),
        }
    }

    fn key(&mut self) -> Result<String> {
        self.skip_whitespace();
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => self.pos += 1,
            _ => return Err(self.error("expected column name")),
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    /// Collects a type token, dropping interior whitespace.
    fn type_token(&mut self) -> Result<String> {
        let mut token = String::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(c) if c.is_ascii_alphanumeric() || c == b'(' || c == b')' => {
                    token.push(c as char);
                    self.pos += 1;
                }
                _ => break,
            }
        }
        if token.is_empty() {
            return Err(self.error("expected column type"));
        }
        Ok(token)
    }

    fn error(&self, msg: &str) -> ClientError {
        let rest = String::from_utf8_lossy(&self.input[self.pos.min(self.input.len())..]);
        ClientError::SchemaError(format!("{} at byte {} (remaining: {:?})", msg, self.pos, rest))
    }
}
