#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # wamas-codec
//!
//! Fixed-width WAMAS telegram codec.
//!
//! Decoding splits a Latin-1 byte stream into lines, reads the 49-character
//! header of each line to find its record type and slices the rest according
//! to the type's [`Grammar`](wamas_grammar::Grammar). Encoding walks a
//! grammar field by field, resolves each value from the input record (or a
//! default) and renders it at its exact width.
//!
//! ## Example
//!
//! ```
//! use wamas_codec::{DecodeOptions, EncodeOptions, EncodePlan, TelegramEncoder, decode_stream};
//! use wamas_grammar::GrammarRegistry;
//! use wamas_record::GenericRecord;
//!
//! let registry = GrammarRegistry::builtin();
//! let mut supplier = GenericRecord::new();
//! supplier.insert("ref", "S-100");
//! supplier.insert("name", "Alpine Dairy");
//!
//! let mut encoder = TelegramEncoder::new(&registry, EncodeOptions::default().with_seed(7));
//! let lines = encoder.encode_records(&supplier, &EncodePlan::from_types(&["LST"])).unwrap();
//! let bytes = wamas_codec::lines_to_bytes(&lines);
//!
//! let telegram = decode_stream(&bytes, &registry, &DecodeOptions::default()).unwrap();
//! assert_eq!(telegram.lines("LST").len(), 1);
//! ```

mod defaults;

/// Telegram stream decoding and length tolerances.
pub mod decoder;
/// Field resolution and line encoding.
pub mod encoder;
/// ISO-8859-1 byte conversion.
pub mod latin1;
/// WAMAS-to-WAMAS conversion of decoded telegrams.
pub mod remap;
/// Decoded telegram containers.
pub mod telegram;
/// Single value rendering and parsing.
pub mod value_codec;

pub use decoder::{DEFAULT_IGNORED_TYPES, DecodeOptions, decode_stream};
pub use encoder::{
    EncodeOptions, EncodePlan, EncodedLine, LineContext, LoopPosition, ParentIdRegistry,
    SystemIds, TelegramEncoder, lines_to_bytes, lines_to_string,
};
pub use remap::remap_telegram;
pub use telegram::{Telegram, TelegramHeader, TelegramLine};
pub use value_codec::{decode_value, encode_value};

use thiserror::Error;

/// Errors raised while reading or writing telegrams
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown record type '{record_type}' at line {line}")]
    UnknownRecordType { record_type: String, line: usize },

    #[error(
        "Length mismatch for {record_type} at line {line}: expected {expected} characters, got {actual}"
    )]
    LengthMismatch {
        record_type: String,
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid {kind} value '{value}' for field {field} at line {line}: {reason}")]
    ValueFormat {
        field: String,
        kind: String,
        value: String,
        reason: String,
        line: usize,
    },

    #[error("No parent id for {record_type}.{field}: expected {parent_field} to be written first")]
    MissingParentId {
        record_type: String,
        field: String,
        parent_field: String,
    },

    #[error("No WAMAS conversion defined for record types: {0}")]
    UnsupportedConversion(String),

    #[error("Grammar error: {0}")]
    Grammar(#[from] wamas_grammar::Error),
}

impl Error {
    /// Create an unknown-record-type error.
    pub fn unknown_record_type(record_type: impl Into<String>, line: usize) -> Self {
        Self::UnknownRecordType {
            record_type: record_type.into(),
            line,
        }
    }

    /// Create a value-format error; the line is attached later by the caller.
    pub fn value_format(
        field: impl Into<String>,
        kind: impl ToString,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ValueFormat {
            field: field.into(),
            kind: kind.to_string(),
            value: value.into(),
            reason: reason.into(),
            line: 0,
        }
    }

    /// Attach a line number to errors that carry one.
    pub fn at_line(mut self, line_no: usize) -> Self {
        if let Self::ValueFormat { line, .. } = &mut self {
            *line = line_no;
        }
        self
    }
}

/// Crate-local result type for codec operations.
pub type Result<T> = std::result::Result<T, Error>;
