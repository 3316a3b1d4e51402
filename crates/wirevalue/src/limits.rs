//! Security limits for decoding.
//!
//! The wire formats impose no nesting or size bounds of their own, so the
//! decoders enforce these.

/// Default maximum nesting depth of a decoded value.
///
/// Every container level and every dynamic envelope counts as one level.
pub const MAX_DEPTH: usize = 256;

/// Default maximum payload size in bytes (64 MiB).
pub const MAX_INPUT_LEN: usize = 64 * 1024 * 1024;

/// Largest accepted magnitude of a decimal exponent.
pub const MAX_NUMBER_EXPONENT: i64 = 1_000_000;

/// MessagePack extension type used when encoding unknown values.
pub const UNKNOWN_EXT_TYPE: u8 = 0;
