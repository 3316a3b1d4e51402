//! Type-directed encoding and decoding for both wire formats.
//!
//! - [`text`]: JSON
//! - [`binary`]: MessagePack
//!
//! Both decoders share [`DecodeOptions`], the path tracking of
//! [`crate::model::Path`] and the element type reconciliation in
//! `reconcile`.

pub mod binary;
pub mod json_token;
pub mod primitives;
pub(crate) mod reconcile;
pub mod text;

pub use binary::{decode_binary, decode_binary_with_options, encode_binary};
pub use primitives::{Reader, Writer};
pub use text::{decode_text, decode_text_with_options, encode_text};

use crate::limits::{MAX_DEPTH, MAX_INPUT_LEN};

/// Options for decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum nesting depth. Every container level and every dynamic
    /// envelope counts as one level.
    pub max_depth: usize,
    /// Maximum input size in bytes.
    pub max_input_len: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            max_input_len: MAX_INPUT_LEN,
        }
    }
}
