#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # wamas-record
//!
//! Format-neutral record model used on both sides of a WAMAS conversion.
//!
//! Decoded telegram lines, flattened UBL documents and ERP dictionaries are all
//! carried as [`GenericRecord`]s: ordered maps from field name to [`Value`],
//! with dotted-path lookup into nested records and lists.

/// Ordered records and dotted-path lookup.
pub mod record;
/// Tolerant date/time parsing and timezone conversion.
pub mod temporal;
/// Typed values with truthiness and text rendering.
pub mod value;

pub use record::GenericRecord;
pub use temporal::{DEFAULT_TIMEZONE, Temporal, parse_temporal};
pub use value::{Value, format_decimal};

use thiserror::Error;

/// Errors that can occur when building records
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid JSON input: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
}

impl Error {
    /// Build a type-mismatch error from the expected and observed shapes.
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Crate-local result type for record operations.
pub type Result<T> = std::result::Result<T, Error>;
