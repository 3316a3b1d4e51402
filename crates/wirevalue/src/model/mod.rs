//! Data model types.
//!
//! This module contains the types shared by both wire formats:
//! - Type descriptors
//! - Exact decimal numbers
//! - Typed values
//! - Paths used to locate errors

pub mod number;
pub mod path;
pub mod ty;
pub mod value;

pub use number::Number;
pub use path::{Path, PathStep, render_steps};
pub use ty::{Type, unify};
pub use value::{Value, ValueKind};
