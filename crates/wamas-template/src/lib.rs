#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # wamas-template
//!
//! Minimal QWeb-style XML templating used to render UBL documents.
//!
//! Templates are plain XML whose elements may carry `t-*` directives
//! (`t-raw`, `t-rawf`, `t-if`, `t-foreach`/`t-as`, `t-set`/`t-eval`, `t-att*`,
//! `t-trim`). Directive values are expressions in a small, side-effect free
//! language evaluated against a [`RenderContext`]; only a fixed set of helper
//! functions and methods can be called.
//!
//! ```
//! use wamas_record::GenericRecord;
//! use wamas_template::{RenderContext, Template};
//!
//! let source = concat!(
//!     r#"<Order><cbc:ID t-raw="record.id"/>"#,
//!     r#"<t t-if="record.note"><Note t-raw="record.note"/></t></Order>"#,
//! );
//! let template = Template::parse(source).unwrap();
//! let mut record = GenericRecord::new();
//! record.insert("id", "P-1");
//! assert_eq!(
//!     template.render(&RenderContext::new(record)),
//!     "<Order>P-1</Order>"
//! );
//! ```

/// Evaluation of expressions against a scope chain.
pub mod eval;
/// Expression syntax tree and parser.
pub mod expr;
mod format;
mod render;

pub use eval::{RenderContext, Scope, evaluate};
pub use expr::{Expr, parse_expr};
pub use render::Template;

use thiserror::Error;

/// Errors that can occur while loading or evaluating templates
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Template parse error: {0}")]
    Parse(String),

    #[error("Syntax error in expression '{expr}': {reason}")]
    Syntax { expr: String, reason: String },

    #[error("Evaluation error: {0}")]
    Eval(String),
}

impl Error {
    /// Create a syntax error for an expression.
    pub fn syntax(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Syntax {
            expr: expr.into(),
            reason: reason.into(),
        }
    }

    /// Create an evaluation error.
    pub fn eval(reason: impl Into<String>) -> Self {
        Self::Eval(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
