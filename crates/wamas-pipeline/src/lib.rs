#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # wamas-pipeline
//!
//! Conversions between WAMAS telegrams, generic records and UBL documents.
//!
//! The [`Converter`] ties the other crates together: it decodes telegrams,
//! detects which business document they carry, renders the matching UBL
//! template and, in the other direction, flattens UBL XML or ERP records and
//! encodes them into telegram lines.
//!
//! ```
//! use wamas_pipeline::{Converter, DictDocument};
//! use wamas_record::GenericRecord;
//!
//! let converter = Converter::new().with_seed(1);
//! let mut supplier = GenericRecord::new();
//! supplier.insert("ref", "S-100");
//! supplier.insert("name", "Alpine Dairy");
//!
//! let wamas = converter.dict_to_wamas(&supplier, DictDocument::Supplier).unwrap();
//! assert_eq!(converter.detect_type(&wamas).unwrap().as_str(), "Supplier");
//! ```

/// YAML configuration of a converter.
pub mod config;
/// The conversion facade.
pub mod converter;
/// Document kind detection from record types.
pub mod detect;
/// Templates and encode plans per document kind.
pub mod dispatch;
/// Grouping of decoded lines into transfers.
pub mod extract;
/// UBL XML flattening.
pub mod ubl;

pub use config::ConversionConfig;
pub use converter::{CheckReport, Converter};
pub use detect::{DocumentKind, detect};
pub use dispatch::{DictDocument, TemplateSpec, UblDocument};
pub use extract::{Extractor, Transfer};
pub use ubl::flatten_xml;

use thiserror::Error;

/// Errors that can occur during a conversion
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Codec(#[from] wamas_codec::Error),

    #[error(transparent)]
    Grammar(#[from] wamas_grammar::Error),

    #[error(transparent)]
    Template(#[from] wamas_template::Error),

    #[error(transparent)]
    Record(#[from] wamas_record::Error),

    #[error("Missing telegram: {0}")]
    MissingTelegram(String),

    #[error("Unsupported document: {0}")]
    UnsupportedDocument(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error during {operation} for '{path}': {message}")]
    Io {
        operation: String,
        path: String,
        message: String,
    },
}

impl Error {
    /// Create an unsupported-document error.
    pub fn unsupported(document: impl Into<String>) -> Self {
        Self::UnsupportedDocument(document.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a structured I/O error with operation/path context.
    pub fn io(
        operation: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_preserves_operation_and_path_context() {
        let error = Error::io("read config", "/etc/wamas.yaml", "permission denied");
        match error {
            Error::Io {
                operation,
                path,
                message,
            } => {
                assert_eq!(operation, "read config");
                assert_eq!(path, "/etc/wamas.yaml");
                assert_eq!(message, "permission denied");
            }
            _ => panic!("expected io variant"),
        }
    }

    #[test]
    fn codec_errors_keep_their_message() {
        let error: Error = wamas_codec::Error::UnsupportedConversion("LST".into()).into();
        assert_eq!(
            error.to_string(),
            "No WAMAS conversion defined for record types: LST"
        );
    }
}
