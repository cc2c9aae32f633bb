//! Format strings used by `t-rawf` and `t-attf-*`.
//!
//! Two placeholder styles are accepted: `{expr}` with `{{` and `}}` for
//! literal braces, and `%(expr)s` with `%%` for a literal percent sign.
//! Literal text is kept exactly as written in the template source; only the
//! embedded expressions are unescaped.

use crate::eval::{Scope, evaluate};
use crate::expr::{Expr, parse_expr};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Literal(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Format {
    source: String,
    parts: Vec<Part>,
}

impl Format {
    /// Compile a format string as written in the template (XML-escaped).
    pub(crate) fn parse(raw: &str) -> Result<Self> {
        let chars: Vec<char> = raw.chars().collect();
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut pos = 0;

        while pos < chars.len() {
            let next = chars.get(pos + 1).copied();
            match (chars[pos], next) {
                ('{', Some('{')) | ('}', Some('}')) | ('%', Some('%')) => {
                    literal.push(chars[pos]);
                    pos += 2;
                }
                ('{', _) => {
                    let end = closing(raw, &chars, pos + 1, '{', '}')?;
                    push_expr(raw, &mut parts, &mut literal, &chars[pos + 1..end])?;
                    pos = end + 1;
                }
                ('}', _) => return Err(Error::syntax(raw, "single '}' in format string")),
                ('%', Some('(')) => {
                    let end = closing(raw, &chars, pos + 2, '(', ')')?;
                    if chars.get(end + 1) != Some(&'s') {
                        return Err(Error::syntax(raw, "only %(...)s placeholders are supported"));
                    }
                    push_expr(raw, &mut parts, &mut literal, &chars[pos + 2..end])?;
                    pos = end + 2;
                }
                (c, _) => {
                    literal.push(c);
                    pos += 1;
                }
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }
        Ok(Self {
            source: raw.to_string(),
            parts,
        })
    }

    pub(crate) fn source(&self) -> &str {
        &self.source
    }

    /// Render the format; the first failing placeholder fails the whole string.
    pub(crate) fn render(&self, scope: &Scope<'_>) -> Result<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Expr(expr) => out.push_str(&evaluate(expr, scope)?.to_text()),
            }
        }
        Ok(out)
    }
}

/// Position of the delimiter closing a placeholder opened just before
/// `start`, skipping quoted strings and nested pairs.
fn closing(raw: &str, chars: &[char], start: usize, open: char, close: char) -> Result<usize> {
    let mut depth = 0usize;
    let mut quote = None;
    for (pos, &c) in chars.iter().enumerate().skip(start) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == open => depth += 1,
            None if c == close && depth == 0 => return Ok(pos),
            None if c == close => depth -= 1,
            None => {}
        }
    }
    Err(Error::syntax(raw, format!("unclosed '{open}' in format string")))
}

fn push_expr(
    raw: &str,
    parts: &mut Vec<Part>,
    literal: &mut String,
    source: &[char],
) -> Result<()> {
    if !literal.is_empty() {
        parts.push(Part::Literal(std::mem::take(literal)));
    }
    let source: String = source.iter().collect();
    let source =
        quick_xml::escape::unescape(&source).map_err(|e| Error::syntax(raw, e.to_string()))?;
    parts.push(Part::Expr(parse_expr(&source)?));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::RenderContext;
    use wamas_record::GenericRecord;

    fn render(raw: &str) -> Result<String> {
        let mut record = GenericRecord::new();
        record.insert("id", "OUT/7");
        record.insert("qty", 3i64);
        let ctx = RenderContext::new(record);
        Format::parse(raw)?.render(&Scope::new(&ctx))
    }

    #[test]
    fn test_both_placeholder_styles() {
        assert_eq!(render("#{record.id}-%(record.qty * 2)s").unwrap(), "#OUT/7-6");
        assert_eq!(render("{{literal}} 100%% {'}'}").unwrap(), "{literal} 100% }");
        assert_eq!(render("%(len(record.id))s").unwrap(), "5");
    }

    #[test]
    fn test_literal_text_stays_escaped() {
        assert_eq!(render("a &amp; {record.qty &gt; 2}").unwrap(), "a &amp; True");
    }

    #[test]
    fn test_malformed_formats() {
        for raw in ["{record.id", "oops}", "%(record.id)d", "{}"] {
            assert!(Format::parse(raw).is_err(), "{raw:?}");
        }
    }

    #[test]
    fn test_failing_placeholder_fails_render() {
        assert!(matches!(render("x{record.missing}"), Err(Error::Eval(_))));
    }
}
