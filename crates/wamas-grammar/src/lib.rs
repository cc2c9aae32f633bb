#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # wamas-grammar
//!
//! Fixed-width grammars for WAMAS telegrams.
//!
//! Every record type (`Satzart`) is described by a [`Grammar`]: an ordered list
//! of [`FieldSpec`]s whose widths add up to the exact line length. The
//! [`GrammarRegistry`] bundles the grammars with the tables the codec needs
//! (type conversions, parent/child keys, unit codes, decode tolerances) and is
//! immutable once built.

mod builtin;
/// Shared telegram header and `Satzart` handling.
pub mod header;
/// YAML grammar files.
pub mod loader;
/// Field, grammar and value-source definitions.
pub mod model;
/// Immutable registry and its builder.
pub mod registry;
/// WAMAS ↔ UBL unit codes.
pub mod unit_code;

pub use builtin::DESPATCH_LINE;
pub use header::{Direction, HEADER_WIDTH, TELHEADER_WIDTH, header_grammar, split_satzart};
pub use model::{DefaultFn, FieldSpec, Grammar, Interval, Party, SourcePath, ValueKind};
pub use registry::{DecodeTolerance, GrammarRegistry, RegistryBuilder};
pub use unit_code::UnitCodeMap;

use thiserror::Error;

/// Errors that can occur when working with grammars
#[derive(Error, Debug)]
pub enum Error {
    #[error("Grammar not found for record type: {0}")]
    NotFound(String),

    #[error("Invalid grammar format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
