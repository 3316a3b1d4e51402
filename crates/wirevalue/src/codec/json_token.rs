//! Byte-level JSON tokenizer.
//!
//! The text decoder drives this directly: it peeks the kind of the next
//! value and then asks for exactly the token it expects. Strings without
//! escapes are borrowed from the input; escaped strings are unescaped by
//! `serde_json`.

use std::borrow::Cow;

use crate::error::ReadError;

/// Kind of the next JSON value, decided by its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    fn skip_ws(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.data.get(self.pos) {
            self.pos += 1;
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn unexpected(&self, context: &'static str) -> ReadError {
        match self.peek() {
            Some(byte) => ReadError::UnexpectedByte {
                byte,
                offset: self.pos,
                context,
            },
            None => ReadError::UnexpectedEof { context },
        }
    }

    fn expect_byte(&mut self, byte: u8, context: &'static str) -> Result<(), ReadError> {
        self.skip_ws();
        if self.peek() != Some(byte) {
            return Err(self.unexpected(context));
        }
        self.pos += 1;
        Ok(())
    }

    fn expect_literal(&mut self, literal: &[u8], context: &'static str) -> Result<(), ReadError> {
        let end = self.pos + literal.len();
        if self.data.get(self.pos..end) != Some(literal) {
            return Err(self.unexpected(context));
        }
        self.pos = end;
        Ok(())
    }

    /// Skips whitespace and classifies the next value.
    pub fn peek_kind(&mut self) -> Result<JsonKind, ReadError> {
        self.skip_ws();
        match self.peek() {
            Some(b'n') => Ok(JsonKind::Null),
            Some(b't' | b'f') => Ok(JsonKind::Bool),
            Some(b'"') => Ok(JsonKind::String),
            Some(b'[') => Ok(JsonKind::Array),
            Some(b'{') => Ok(JsonKind::Object),
            Some(b'-' | b'0'..=b'9') => Ok(JsonKind::Number),
            _ => Err(self.unexpected("value")),
        }
    }

    pub fn read_null(&mut self) -> Result<(), ReadError> {
        self.skip_ws();
        self.expect_literal(b"null", "null")
    }

    pub fn read_bool(&mut self) -> Result<bool, ReadError> {
        self.skip_ws();
        match self.peek() {
            Some(b't') => self.expect_literal(b"true", "bool").map(|_| true),
            _ => self.expect_literal(b"false", "bool").map(|_| false),
        }
    }

    /// Reads a number literal and returns its text.
    ///
    /// Follows the JSON grammar exactly: no leading `+`, no leading zeros,
    /// at least one digit after `.` and after the exponent marker.
    pub fn read_number_literal(&mut self) -> Result<&'a str, ReadError> {
        self.skip_ws();
        let start = self.pos;
        let invalid = ReadError::InvalidNumber { offset: start };

        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        match self.peek() {
            Some(b'0') => self.pos += 1,
            Some(b'1'..=b'9') => self.skip_digits(),
            _ => return Err(invalid),
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            if !self.skip_digits_required() {
                return Err(invalid);
            }
        }
        if let Some(b'e' | b'E') = self.peek() {
            self.pos += 1;
            if let Some(b'+' | b'-') = self.peek() {
                self.pos += 1;
            }
            if !self.skip_digits_required() {
                return Err(invalid);
            }
        }
        std::str::from_utf8(&self.data[start..self.pos]).map_err(|_| invalid)
    }

    fn skip_digits(&mut self) {
        while let Some(b'0'..=b'9') = self.peek() {
            self.pos += 1;
        }
    }

    fn skip_digits_required(&mut self) -> bool {
        let start = self.pos;
        self.skip_digits();
        self.pos > start
    }

    /// Reads a string literal and returns its unescaped contents.
    pub fn read_string(&mut self) -> Result<Cow<'a, str>, ReadError> {
        self.skip_ws();
        let start = self.pos;
        if self.peek() != Some(b'"') {
            return Err(self.unexpected("string"));
        }
        self.pos += 1;

        let mut escaped = false;
        loop {
            match self.peek() {
                None => return Err(ReadError::UnexpectedEof { context: "string" }),
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    escaped = true;
                    self.pos += 2;
                }
                Some(byte) if byte < 0x20 => {
                    return Err(ReadError::InvalidString {
                        offset: self.pos,
                        reason: "control character in string".to_string(),
                    });
                }
                Some(_) => self.pos += 1,
            }
        }

        let raw = &self.data[start..self.pos];
        if escaped {
            serde_json::from_slice::<String>(raw)
                .map(Cow::Owned)
                .map_err(|e| ReadError::InvalidString {
                    offset: start,
                    reason: e.to_string(),
                })
        } else {
            std::str::from_utf8(&raw[1..raw.len() - 1])
                .map(Cow::Borrowed)
                .map_err(|_| ReadError::InvalidUtf8 { field: "string" })
        }
    }

    pub fn begin_array(&mut self) -> Result<(), ReadError> {
        self.expect_byte(b'[', "array")
    }

    /// Advances to the next array element.
    ///
    /// Returns false once the closing bracket has been consumed. `first`
    /// tracks whether a separating comma is required.
    pub fn array_next(&mut self, first: &mut bool) -> Result<bool, ReadError> {
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(false);
        }
        if !*first {
            self.expect_byte(b',', "array")?;
        }
        *first = false;
        Ok(true)
    }

    pub fn begin_object(&mut self) -> Result<(), ReadError> {
        self.expect_byte(b'{', "object")
    }

    /// Advances to the next object member and reads its key and colon.
    ///
    /// Returns `None` once the closing brace has been consumed.
    pub fn object_next_key(&mut self, first: &mut bool) -> Result<Option<Cow<'a, str>>, ReadError> {
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(None);
        }
        if !*first {
            self.expect_byte(b',', "object")?;
        }
        *first = false;
        let key = self.read_string()?;
        self.expect_byte(b':', "object")?;
        Ok(Some(key))
    }

    /// Skips one value and returns its raw bytes.
    ///
    /// Containers are skipped by bracket counting only; whoever decodes the
    /// returned slice validates its structure. No recursion, so arbitrarily
    /// deep input cannot exhaust the stack here.
    pub fn skip_value(&mut self) -> Result<&'a [u8], ReadError> {
        let kind = self.peek_kind()?;
        let start = self.pos;
        match kind {
            JsonKind::Null => self.read_null()?,
            JsonKind::Bool => {
                self.read_bool()?;
            }
            JsonKind::Number => {
                self.read_number_literal()?;
            }
            JsonKind::String => {
                self.read_string()?;
            }
            JsonKind::Array | JsonKind::Object => {
                let mut depth = 0usize;
                loop {
                    match self.peek() {
                        None => return Err(ReadError::UnexpectedEof { context: "value" }),
                        Some(b'[' | b'{') => {
                            depth += 1;
                            self.pos += 1;
                        }
                        Some(b']' | b'}') => {
                            depth -= 1;
                            self.pos += 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        Some(b'"') => {
                            self.read_string()?;
                        }
                        Some(_) => self.pos += 1,
                    }
                }
            }
        }
        Ok(&self.data[start..self.pos])
    }

    /// Succeeds if only whitespace remains.
    pub fn finish(&mut self) -> Result<(), ReadError> {
        self.skip_ws();
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.unexpected("end of input")),
        }
    }
}
