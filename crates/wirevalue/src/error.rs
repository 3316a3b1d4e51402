//! Error types for decoding, encoding and type descriptors.

use thiserror::Error;

use crate::model::{PathStep, render_steps};

/// Classification of a [`PathError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed wire bytes: truncated input, bad UTF-8, invalid tokens.
    Syntax,
    /// The wire token does not match what the expected type requires.
    StructuralMismatch,
    /// The token kind is acceptable but its content cannot be coerced.
    ValueMismatch,
    /// Tuple or object length or attribute set does not match the type.
    ArityMismatch,
    /// A dynamic value's type envelope is malformed or missing.
    UnresolvableDynamicType,
    /// Elements under a dynamic element type cannot be unified.
    UnreconcilableElements,
    /// A configured decode limit was exceeded.
    LimitExceeded,
    /// The value cannot be represented in the target wire format.
    UnencodableValue,
}

impl ErrorKind {
    /// Returns a stable short name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::StructuralMismatch => "structural_mismatch",
            ErrorKind::ValueMismatch => "value_mismatch",
            ErrorKind::ArityMismatch => "arity_mismatch",
            ErrorKind::UnresolvableDynamicType => "unresolvable_dynamic_type",
            ErrorKind::UnreconcilableElements => "unreconcilable_elements",
            ErrorKind::LimitExceeded => "limit_exceeded",
            ErrorKind::UnencodableValue => "unencodable_value",
        }
    }
}

/// An error located at a path inside the document.
///
/// `path` is a snapshot taken when the error was raised; it names exactly the
/// node that failed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}{message}", path_prefix(.path))]
pub struct PathError {
    pub path: Vec<PathStep>,
    pub kind: ErrorKind,
    pub message: String,
}

impl PathError {
    /// The path rendered as text, e.g. `.x[0]`; empty at the root.
    pub fn path_string(&self) -> String {
        render_steps(&self.path)
    }
}

fn path_prefix(path: &[PathStep]) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{}: ", render_steps(path))
    }
}

/// Low-level failure while reading wire bytes.
///
/// Decoders never return this directly; it is wrapped into a [`PathError`]
/// at the point of failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReadError {
    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("unexpected byte 0x{byte:02x} at offset {offset} while reading {context}")]
    UnexpectedByte {
        byte: u8,
        offset: usize,
        context: &'static str,
    },

    #[error("invalid number literal at offset {offset}")]
    InvalidNumber { offset: usize },

    #[error("invalid string literal at offset {offset}: {reason}")]
    InvalidString { offset: usize, reason: String },

    #[error("{field} length {len} exceeds remaining input ({remaining} bytes)")]
    LengthExceedsInput {
        field: &'static str,
        len: usize,
        remaining: usize,
    },
}

/// Failure to parse a type descriptor from its JSON form.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("unknown primitive type {0:?}")]
    UnknownPrimitive(String),

    #[error("unknown type kind {0:?}")]
    UnknownKind(String),

    #[error("type kind {kind:?} takes one parameter, found {found}")]
    WrongParameterCount { kind: String, found: usize },

    #[error("malformed type: {reason}")]
    Malformed { reason: &'static str },
}

/// Failure to parse a decimal number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberError {
    #[error("invalid number {0:?}")]
    Invalid(String),

    #[error("number {0:?} has an exponent out of range")]
    ExponentOutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[test]
    fn test_path_error_display() {
        let err = PathError {
            path: vec![
                PathStep::Attr("x".to_string()),
                PathStep::Key(Value::string("k")),
                PathStep::Index(2),
            ],
            kind: ErrorKind::ValueMismatch,
            message: "a number is required".to_string(),
        };
        assert_eq!(err.to_string(), r#".x["k"][2]: a number is required"#);
        assert_eq!(err.path_string(), r#".x["k"][2]"#);
    }

    #[test]
    fn test_root_error_display() {
        let err = PathError {
            path: Vec::new(),
            kind: ErrorKind::Syntax,
            message: "extraneous data after value".to_string(),
        };
        assert_eq!(err.to_string(), "extraneous data after value");
        assert_eq!(err.kind.as_str(), "syntax");
    }
}
