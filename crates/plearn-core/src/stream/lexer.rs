//! Reading primitives of PStream
//!
//! Single-pass byte cursor over the input buffer. Blanks are space, tab,
//! CR and LF; `#` starts a comment running to the end of the line; `;` and
//! `,` separate options and container elements.

use super::{binary_payload_len, is_binary_tag, PStream};
use crate::error::{PLearnError, PResult};

fn is_blank(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b':'
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'+' | b'-' | b'.')
}

/// Bytes that end a bare (unquoted) word
fn is_delimiter(b: u8) -> bool {
    is_blank(b) || matches!(b, b';' | b',' | b'(' | b')' | b'[' | b']' | b'{' | b'}' | b':' | b'=')
}

impl PStream {
    /// Syntax error at the current position
    pub fn error(&self, message: impl Into<String>) -> PLearnError {
        PLearnError::syntax(self.pos, message)
    }

    /// True when every input byte has been consumed
    pub fn at_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Next byte, without consuming it
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Byte `offset` positions after the cursor
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Consume one byte
    pub fn get(&mut self) -> PResult<u8> {
        let byte = self
            .peek()
            .ok_or_else(|| self.error("Unexpected end of stream"))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Consume exactly `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> PResult<Vec<u8>> {
        if self.pos + n > self.input.len() {
            return Err(self.error(format!("Expected {} more bytes before end of stream", n)));
        }
        let bytes = self.input[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(bytes)
    }

    /// Skip spaces, tabs and newlines
    pub fn skip_blanks(&mut self) {
        while let Some(b) = self.peek() {
            if !is_blank(b) {
                break;
            }
            self.pos += 1;
        }
    }

    /// Skip blanks and `#` comments
    pub fn skip_blanks_and_comments(&mut self) {
        loop {
            self.skip_blanks();
            if self.peek() != Some(b'#') {
                return;
            }
            self.skip_line();
        }
    }

    /// Skip blanks, comments and `;`/`,` separators
    pub fn skip_separators(&mut self) {
        loop {
            self.skip_blanks_and_comments();
            match self.peek() {
                Some(b';') | Some(b',') => self.pos += 1,
                _ => return,
            }
        }
    }

    /// Skip to just past the next newline
    pub fn skip_line(&mut self) {
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == b'\n' {
                break;
            }
        }
    }

    /// Skip the remainder of the current line, unless the cursor is already
    /// at the start of one
    pub fn skip_rest_of_line(&mut self) {
        if self.pos > 0 && self.input.get(self.pos - 1) == Some(&b'\n') {
            return;
        }
        self.skip_line();
    }

    /// Skip blanks and comments, then consume `expected`
    pub fn expect(&mut self, expected: u8) -> PResult<()> {
        self.skip_blanks_and_comments();
        match self.peek() {
            Some(b) if b == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(self.error(format!(
                "Expected '{}' but found '{}'",
                expected as char,
                b as char
            ))),
            None => Err(self.error(format!(
                "Expected '{}' but reached end of stream",
                expected as char
            ))),
        }
    }

    /// Read an identifier: letters, digits, `_` and `:`
    pub fn read_word(&mut self) -> PResult<String> {
        self.skip_blanks_and_comments();
        let start = self.pos;
        while self.peek().is_some_and(is_word_byte) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(match self.peek() {
                Some(b) => self.error(format!("Expected a name but found '{}'", b as char)),
                None => self.error("Expected a name but reached end of stream"),
            });
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    /// Read an option path up to `=`, e.g. `weights[3]` or `sub.bias`
    pub fn read_option_name(&mut self) -> PResult<String> {
        self.skip_blanks_and_comments();
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_blank(b) || matches!(b, b'=' | b';' | b',' | b'(' | b')') {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("Expected an option name"));
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    /// Read a number-like token: digits, letters, `_`, `+`, `-`, `.`
    pub fn read_token(&mut self) -> PResult<String> {
        self.skip_blanks_and_comments();
        let start = self.pos;
        while self.peek().is_some_and(is_token_byte) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(match self.peek() {
                Some(b) => self.error(format!("Expected a value but found '{}'", b as char)),
                None => self.error("Expected a value but reached end of stream"),
            });
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    /// Read a string, either double-quoted or as a bare word
    pub fn read_string(&mut self) -> PResult<String> {
        self.skip_blanks_and_comments();
        if self.peek() == Some(b'"') {
            return self.read_quoted_string();
        }
        let start = self.pos;
        while self.peek().is_some_and(|b| !is_delimiter(b)) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("Expected a string"));
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    /// Read a double-quoted string and unescape it
    pub fn read_quoted_string(&mut self) -> PResult<String> {
        self.expect(b'"')?;
        let mut bytes = Vec::new();
        loop {
            let b = self
                .peek()
                .ok_or_else(|| self.error("Unterminated string"))?;
            self.pos += 1;
            match b {
                b'"' => break,
                b'\\' => {
                    let escaped = self
                        .peek()
                        .ok_or_else(|| self.error("Unexpected end of string escape"))?;
                    self.pos += 1;
                    bytes.push(match escaped {
                        b'n' => b'\n',
                        b't' => b'\t',
                        b'r' => b'\r',
                        b'"' => b'"',
                        b'\\' => b'\\',
                        other => {
                            return Err(self.error(format!(
                                "Invalid escape sequence: \\{}",
                                other as char
                            )))
                        }
                    });
                }
                other => bytes.push(other),
            }
        }
        String::from_utf8(bytes).map_err(|_| self.error("String is not valid UTF-8"))
    }

    /// Read raw text up to (not including) `delim`, consuming the delimiter
    pub fn read_until(&mut self, delim: u8) -> PResult<String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == delim {
                let text = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
                self.pos += 1;
                return Ok(text);
            }
            self.pos += 1;
        }
        Err(PLearnError::syntax(
            start,
            format!("Missing closing '{}'", delim as char),
        ))
    }

    /// Skip one indivisible unit: a quoted string, a backquoted path, a
    /// binary number, a whole word or number, or else a single byte
    pub fn skip_atom(&mut self) -> PResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(b'"') => self.read_quoted_string().map(drop),
            Some(b'`') => {
                self.pos += 1;
                self.read_until(b'`').map(drop)
            }
            Some(tag) if is_binary_tag(tag) => {
                let len = binary_payload_len(tag).unwrap_or(0);
                self.read_bytes(1 + len).map(drop)
            }
            Some(b) if is_word_byte(b) || is_token_byte(b) => {
                while self.peek().is_some_and(|b| is_word_byte(b) || is_token_byte(b)) {
                    self.pos += 1;
                }
                Ok(())
            }
            Some(_) => {
                self.pos += 1;
                Ok(())
            }
        }
    }

    /// Word starting `offset` bytes after the cursor, and the offset just
    /// past it; `None` when no word starts there
    pub(crate) fn peek_word_at(&self, offset: usize) -> Option<(String, usize)> {
        let start = self.pos + offset;
        let end = self.input[start.min(self.input.len())..]
            .iter()
            .position(|b| !is_word_byte(*b))
            .map_or(self.input.len(), |len| start + len);
        if end <= start {
            return None;
        }
        let word = String::from_utf8_lossy(&self.input[start..end]).into_owned();
        Some((word, end - self.pos))
    }

    /// Offset of the first non-blank byte at or after `offset`
    pub(crate) fn skip_blanks_at(&self, mut offset: usize) -> usize {
        while self.peek_at(offset).is_some_and(is_blank) {
            offset += 1;
        }
        offset
    }

    /// Skip one syntactic value without interpreting it
    ///
    /// Stops before the `;`, `,` or closing bracket that ends the value at
    /// nesting depth zero. Quoted strings, backquoted paths and binary
    /// numbers are skipped as units.
    pub fn skip_value(&mut self) -> PResult<()> {
        self.skip_blanks_and_comments();
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'(' | b'[' | b'{' => {
                    depth += 1;
                    self.pos += 1;
                }
                b')' | b']' | b'}' => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    self.pos += 1;
                }
                b';' | b',' if depth == 0 => break,
                b'"' => {
                    self.read_quoted_string()?;
                }
                b'`' => {
                    self.pos += 1;
                    self.read_until(b'`')?;
                }
                b'#' => self.skip_line(),
                tag if is_binary_tag(tag) => {
                    let len = binary_payload_len(tag).unwrap_or(0);
                    self.read_bytes(1 + len)?;
                }
                _ => self.pos += 1,
            }
        }
        if depth != 0 {
            return Err(PLearnError::syntax(start, "Unbalanced brackets in skipped value"));
        }
        Ok(())
    }
}
