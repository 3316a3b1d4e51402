//! Primitive reading and writing for the MessagePack wire format.
//!
//! Implements marker classification, big-endian integers and the length
//! prefixes of the str, bin, array, map and ext families.

use crate::error::ReadError;
use crate::limits::UNKNOWN_EXT_TYPE;

// =============================================================================
// MARKERS
// =============================================================================

pub const NIL: u8 = 0xc0;
pub const FALSE: u8 = 0xc2;
pub const TRUE: u8 = 0xc3;
pub const BIN8: u8 = 0xc4;
pub const BIN16: u8 = 0xc5;
pub const BIN32: u8 = 0xc6;
pub const EXT8: u8 = 0xc7;
pub const EXT16: u8 = 0xc8;
pub const EXT32: u8 = 0xc9;
pub const FLOAT32: u8 = 0xca;
pub const FLOAT64: u8 = 0xcb;
pub const UINT8: u8 = 0xcc;
pub const UINT16: u8 = 0xcd;
pub const UINT32: u8 = 0xce;
pub const UINT64: u8 = 0xcf;
pub const INT8: u8 = 0xd0;
pub const INT16: u8 = 0xd1;
pub const INT32: u8 = 0xd2;
pub const INT64: u8 = 0xd3;
pub const FIXEXT1: u8 = 0xd4;
pub const FIXEXT16: u8 = 0xd8;
pub const STR8: u8 = 0xd9;
pub const STR16: u8 = 0xda;
pub const STR32: u8 = 0xdb;
pub const ARRAY16: u8 = 0xdc;
pub const ARRAY32: u8 = 0xdd;
pub const MAP16: u8 = 0xde;
pub const MAP32: u8 = 0xdf;

/// The value family a marker byte introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Nil,
    Bool,
    Int,
    Float,
    Str,
    Bin,
    Array,
    Map,
    Ext,
    /// 0xc1, which the format never uses.
    Reserved,
}

impl Family {
    /// Human-readable name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Family::Nil => "nil",
            Family::Bool => "bool",
            Family::Int => "integer",
            Family::Float => "float",
            Family::Str => "string",
            Family::Bin => "binary",
            Family::Array => "array",
            Family::Map => "map",
            Family::Ext => "extension",
            Family::Reserved => "reserved marker",
        }
    }
}

/// Classifies a marker byte.
pub fn family(marker: u8) -> Family {
    match marker {
        0x00..=0x7f | 0xe0..=0xff => Family::Int,
        UINT8..=INT64 => Family::Int,
        0x80..=0x8f | MAP16 | MAP32 => Family::Map,
        0x90..=0x9f | ARRAY16 | ARRAY32 => Family::Array,
        0xa0..=0xbf | STR8 | STR16 | STR32 => Family::Str,
        NIL => Family::Nil,
        FALSE | TRUE => Family::Bool,
        BIN8 | BIN16 | BIN32 => Family::Bin,
        EXT8 | EXT16 | EXT32 | FIXEXT1..=FIXEXT16 => Family::Ext,
        FLOAT32 | FLOAT64 => Family::Float,
        _ => Family::Reserved,
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Reader for MessagePack data.
///
/// Wraps a byte slice and provides methods for reading primitives
/// with bounds checking and error handling.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the number of remaining bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns the next byte without consuming it.
    #[inline]
    pub fn peek_byte(&self, context: &'static str) -> Result<u8, ReadError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(ReadError::UnexpectedEof { context })
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_byte(&mut self, context: &'static str) -> Result<u8, ReadError> {
        let byte = self.peek_byte(context)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Reads exactly n bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], ReadError> {
        if n > self.remaining_len() {
            return Err(ReadError::UnexpectedEof { context });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], ReadError> {
        let bytes = self.read_bytes(N, context)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn read_u8(&mut self, context: &'static str) -> Result<u8, ReadError> {
        self.read_byte(context)
    }

    fn read_u16(&mut self, context: &'static str) -> Result<u16, ReadError> {
        Ok(u16::from_be_bytes(self.read_array(context)?))
    }

    fn read_u32(&mut self, context: &'static str) -> Result<u32, ReadError> {
        Ok(u32::from_be_bytes(self.read_array(context)?))
    }

    fn read_u64(&mut self, context: &'static str) -> Result<u64, ReadError> {
        Ok(u64::from_be_bytes(self.read_array(context)?))
    }

    fn unexpected(&self, byte: u8, context: &'static str) -> ReadError {
        ReadError::UnexpectedByte {
            byte,
            offset: self.pos,
            context,
        }
    }

    /// Reads any integer encoding. The result is widened to `i128` so the
    /// whole uint64 range is representable.
    pub fn read_int(&mut self, context: &'static str) -> Result<i128, ReadError> {
        let marker = self.peek_byte(context)?;
        let value = match marker {
            0x00..=0x7f => marker as i128,
            0xe0..=0xff => marker as i8 as i128,
            UINT8 => {
                self.pos += 1;
                return Ok(self.read_u8(context)? as i128);
            }
            UINT16 => {
                self.pos += 1;
                return Ok(self.read_u16(context)? as i128);
            }
            UINT32 => {
                self.pos += 1;
                return Ok(self.read_u32(context)? as i128);
            }
            UINT64 => {
                self.pos += 1;
                return Ok(self.read_u64(context)? as i128);
            }
            INT8 => {
                self.pos += 1;
                return Ok(self.read_u8(context)? as i8 as i128);
            }
            INT16 => {
                self.pos += 1;
                return Ok(self.read_u16(context)? as i16 as i128);
            }
            INT32 => {
                self.pos += 1;
                return Ok(self.read_u32(context)? as i32 as i128);
            }
            INT64 => {
                self.pos += 1;
                return Ok(self.read_u64(context)? as i64 as i128);
            }
            other => return Err(self.unexpected(other, context)),
        };
        self.pos += 1;
        Ok(value)
    }

    /// Reads a float32 or float64, widening float32.
    pub fn read_float(&mut self, context: &'static str) -> Result<f64, ReadError> {
        match self.peek_byte(context)? {
            FLOAT32 => {
                self.pos += 1;
                Ok(f32::from_bits(self.read_u32(context)?) as f64)
            }
            FLOAT64 => {
                self.pos += 1;
                Ok(f64::from_bits(self.read_u64(context)?))
            }
            other => Err(self.unexpected(other, context)),
        }
    }

    /// Reads a bool.
    pub fn read_bool(&mut self, context: &'static str) -> Result<bool, ReadError> {
        match self.peek_byte(context)? {
            TRUE => {
                self.pos += 1;
                Ok(true)
            }
            FALSE => {
                self.pos += 1;
                Ok(false)
            }
            other => Err(self.unexpected(other, context)),
        }
    }

    /// Reads the payload of a str or bin family value.
    ///
    /// Both families carry raw bytes; producers disagree on which one to use
    /// for strings and byte blobs, so either is accepted.
    pub fn read_raw(&mut self, context: &'static str) -> Result<&'a [u8], ReadError> {
        let marker = self.peek_byte(context)?;
        let len = match marker {
            0xa0..=0xbf => {
                self.pos += 1;
                (marker & 0x1f) as usize
            }
            STR8 | BIN8 => {
                self.pos += 1;
                self.read_u8(context)? as usize
            }
            STR16 | BIN16 => {
                self.pos += 1;
                self.read_u16(context)? as usize
            }
            STR32 | BIN32 => {
                self.pos += 1;
                self.read_u32(context)? as usize
            }
            other => return Err(self.unexpected(other, context)),
        };
        self.read_bytes(len, context)
    }

    /// Reads a UTF-8 string from the str or bin family.
    pub fn read_str(&mut self, field: &'static str) -> Result<&'a str, ReadError> {
        let bytes = self.read_raw(field)?;
        std::str::from_utf8(bytes).map_err(|_| ReadError::InvalidUtf8 { field })
    }

    /// Reads an array header. Returns `None` for nil.
    pub fn read_array_len(&mut self, context: &'static str) -> Result<Option<usize>, ReadError> {
        let marker = self.peek_byte(context)?;
        let len = match marker {
            NIL => {
                self.pos += 1;
                return Ok(None);
            }
            0x90..=0x9f => {
                self.pos += 1;
                (marker & 0x0f) as usize
            }
            ARRAY16 => {
                self.pos += 1;
                self.read_u16(context)? as usize
            }
            ARRAY32 => {
                self.pos += 1;
                self.read_u32(context)? as usize
            }
            other => return Err(self.unexpected(other, context)),
        };
        // Every element takes at least one byte.
        self.check_len(len, 1, context)?;
        Ok(Some(len))
    }

    /// Reads a map header. Returns `None` for nil.
    pub fn read_map_len(&mut self, context: &'static str) -> Result<Option<usize>, ReadError> {
        let marker = self.peek_byte(context)?;
        let len = match marker {
            NIL => {
                self.pos += 1;
                return Ok(None);
            }
            0x80..=0x8f => {
                self.pos += 1;
                (marker & 0x0f) as usize
            }
            MAP16 => {
                self.pos += 1;
                self.read_u16(context)? as usize
            }
            MAP32 => {
                self.pos += 1;
                self.read_u32(context)? as usize
            }
            other => return Err(self.unexpected(other, context)),
        };
        // Every entry takes at least a key byte and a value byte.
        self.check_len(len, 2, context)?;
        Ok(Some(len))
    }

    fn check_len(&self, len: usize, min_size: usize, field: &'static str) -> Result<(), ReadError> {
        let remaining = self.remaining_len();
        if len.saturating_mul(min_size) > remaining {
            return Err(ReadError::LengthExceedsInput {
                field,
                len,
                remaining,
            });
        }
        Ok(())
    }

    /// Skips a whole extension value and returns its type byte.
    pub fn skip_ext(&mut self, context: &'static str) -> Result<u8, ReadError> {
        let marker = self.read_byte(context)?;
        let len = match marker {
            FIXEXT1..=FIXEXT16 => 1usize << (marker - FIXEXT1),
            EXT8 => self.read_u8(context)? as usize,
            EXT16 => self.read_u16(context)? as usize,
            EXT32 => self.read_u32(context)? as usize,
            other => {
                self.pos -= 1;
                return Err(self.unexpected(other, context));
            }
        };
        let ext_type = self.read_byte(context)?;
        self.read_bytes(len, context)?;
        Ok(ext_type)
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writer for MessagePack data.
///
/// Integers and headers are always written in their shortest form.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Creates a new writer with capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns a reference to the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    #[inline]
    fn write_marked(&mut self, marker: u8, bytes: &[u8]) {
        self.buf.push(marker);
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_nil(&mut self) {
        self.write_byte(NIL);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_byte(if value { TRUE } else { FALSE });
    }

    /// Writes a signed integer in its shortest encoding.
    pub fn write_int(&mut self, value: i64) {
        if value >= 0 {
            self.write_uint(value as u64);
        } else if value >= -32 {
            self.write_byte(value as i8 as u8);
        } else if value >= i8::MIN as i64 {
            self.write_marked(INT8, &(value as i8).to_be_bytes());
        } else if value >= i16::MIN as i64 {
            self.write_marked(INT16, &(value as i16).to_be_bytes());
        } else if value >= i32::MIN as i64 {
            self.write_marked(INT32, &(value as i32).to_be_bytes());
        } else {
            self.write_marked(INT64, &value.to_be_bytes());
        }
    }

    /// Writes an unsigned integer in its shortest encoding.
    pub fn write_uint(&mut self, value: u64) {
        if value <= 0x7f {
            self.write_byte(value as u8);
        } else if value <= u8::MAX as u64 {
            self.write_marked(UINT8, &[value as u8]);
        } else if value <= u16::MAX as u64 {
            self.write_marked(UINT16, &(value as u16).to_be_bytes());
        } else if value <= u32::MAX as u64 {
            self.write_marked(UINT32, &(value as u32).to_be_bytes());
        } else {
            self.write_marked(UINT64, &value.to_be_bytes());
        }
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_marked(FLOAT64, &value.to_bits().to_be_bytes());
    }

    pub fn write_str(&mut self, s: &str) {
        let len = s.len();
        if len <= 31 {
            self.write_byte(0xa0 | len as u8);
        } else if len <= u8::MAX as usize {
            self.write_marked(STR8, &[len as u8]);
        } else if len <= u16::MAX as usize {
            self.write_marked(STR16, &(len as u16).to_be_bytes());
        } else {
            self.write_marked(STR32, &(len as u32).to_be_bytes());
        }
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn write_bin(&mut self, bytes: &[u8]) {
        let len = bytes.len();
        if len <= u8::MAX as usize {
            self.write_marked(BIN8, &[len as u8]);
        } else if len <= u16::MAX as usize {
            self.write_marked(BIN16, &(len as u16).to_be_bytes());
        } else {
            self.write_marked(BIN32, &(len as u32).to_be_bytes());
        }
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_array_len(&mut self, len: usize) {
        if len <= 15 {
            self.write_byte(0x90 | len as u8);
        } else if len <= u16::MAX as usize {
            self.write_marked(ARRAY16, &(len as u16).to_be_bytes());
        } else {
            self.write_marked(ARRAY32, &(len as u32).to_be_bytes());
        }
    }

    pub fn write_map_len(&mut self, len: usize) {
        if len <= 15 {
            self.write_byte(0x80 | len as u8);
        } else if len <= u16::MAX as usize {
            self.write_marked(MAP16, &(len as u16).to_be_bytes());
        } else {
            self.write_marked(MAP32, &(len as u32).to_be_bytes());
        }
    }

    /// Writes the unknown-value marker: a one-byte fixext of the reserved type.
    pub fn write_unknown(&mut self) {
        self.write_marked(FIXEXT1, &[UNKNOWN_EXT_TYPE, 0]);
    }
}
