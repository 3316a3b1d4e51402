//! wirevalue: type-directed decoding of dynamic values.
//!
//! This crate decodes untyped wire bytes into strongly-typed, recursively
//! structured values, guided by a type descriptor supplied by the caller.
//! Two wire formats are supported:
//! - **JSON text**, where numbers may also arrive as strings
//! - **MessagePack binary**, where extension values stand for unknowns
//!
//! # Quick Start
//!
//! ```rust
//! use wirevalue::{Type, Value, decode_text, encode_binary, decode_binary};
//!
//! let ty = Type::object([("name", Type::String), ("ports", Type::list(Type::Number))]);
//!
//! let value = decode_text(br#"{"name": "web", "ports": [80, "443"]}"#, &ty).unwrap();
//! assert_eq!(value.get("name"), Some(&Value::string("web")));
//!
//! // Same value through the binary format.
//! let bytes = encode_binary(&value, &ty).unwrap();
//! assert_eq!(decode_binary(&bytes, &ty).unwrap(), value);
//!
//! // Errors name the failing location.
//! let err = decode_text(br#"{"ports": ["x"]}"#, &ty).unwrap_err();
//! assert_eq!(err.to_string(), ".ports[0]: a number is required");
//! ```
//!
//! # Modules
//!
//! - [`model`]: Type descriptors, values, decimal numbers and paths
//! - [`codec`]: Decoders and encoders for both wire formats
//! - [`validate`]: Value/type conformance checking
//! - [`error`]: Error types
//! - [`limits`]: Security limits for decoding
//!
//! # Dynamic values
//!
//! A position typed [`Type::Dynamic`] carries its concrete type in the
//! payload: `{"value": ..., "type": ...}` in JSON and
//! `[bin(type JSON), value]` in MessagePack. Lists, sets and maps with a
//! dynamic element type get their element type from the decoded elements.
//!
//! # Security
//!
//! The decoders are designed to safely handle untrusted input:
//! - Nesting depth and input size are bounded by [`DecodeOptions`]
//! - Length prefixes are checked against the remaining input before
//!   anything is allocated
//! - Decimal exponents are bounded

pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod validate;

// Re-export commonly used types at crate root
pub use codec::{
    DecodeOptions, decode_binary, decode_binary_with_options, decode_text,
    decode_text_with_options, encode_binary, encode_text,
};
pub use error::{ErrorKind, NumberError, PathError, ReadError, TypeError};
pub use model::{Number, Path, PathStep, Type, Value, ValueKind, unify};
pub use validate::validate_value;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
