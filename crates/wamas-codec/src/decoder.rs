use crate::telegram::{Telegram, TelegramHeader, TelegramLine};
use crate::value_codec::decode_value;
use crate::{Error, Result, latin1};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace, warn};
use wamas_grammar::{Grammar, GrammarRegistry, HEADER_WIDTH, TELHEADER_WIDTH, split_satzart};
use wamas_record::GenericRecord;

/// Record types skipped unless the caller says otherwise
pub const DEFAULT_IGNORED_TYPES: [&str; 3] = ["AUSPQ", "TOURQ", "TAUSPQ"];

/// Decoding options
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// When set, any other record type is an error
    pub allowed_types: Option<HashSet<String>>,
    /// Record types whose lines are silently skipped
    pub ignored_types: HashSet<String>,
    /// Read every field as untyped text
    pub use_simplified_grammar: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            allowed_types: None,
            ignored_types: DEFAULT_IGNORED_TYPES.iter().map(|t| t.to_string()).collect(),
            use_simplified_grammar: false,
        }
    }
}

impl DecodeOptions {
    /// Only accept the given record types
    pub fn with_allowed_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the ignored record types
    pub fn with_ignored_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_simplified_grammar(mut self, simplified: bool) -> Self {
        self.use_simplified_grammar = simplified;
        self
    }
}

/// Decode a Latin-1 telegram stream.
///
/// Blank lines are skipped, both `\n` and `\r\n` line ends are accepted.
///
/// # Errors
///
/// Returns [`Error::UnknownRecordType`] for a type without grammar (or one
/// outside `allowed_types`), [`Error::LengthMismatch`] for a line whose length
/// does not match its grammar after the registered tolerances, and
/// [`Error::ValueFormat`] for unparseable numeric fields.
pub fn decode_stream(
    input: &[u8],
    registry: &GrammarRegistry,
    options: &DecodeOptions,
) -> Result<Telegram> {
    let text = latin1::decode(input);
    let mut decoder = LineDecoder::new(registry, options);
    let mut telegram = Telegram::new();

    for (index, raw) in text.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.trim().is_empty() {
            continue;
        }
        if let Some(decoded) = decoder.decode_line(line, index + 1)? {
            telegram.push(decoded);
        }
    }

    debug!(
        lines = telegram.len(),
        types = ?telegram.observed_types(),
        "telegram decoded"
    );
    Ok(telegram)
}

/// Per-stream decoding state
struct LineDecoder<'a> {
    registry: &'a GrammarRegistry,
    options: &'a DecodeOptions,
    simplified: HashMap<String, Grammar>,
}

impl<'a> LineDecoder<'a> {
    fn new(registry: &'a GrammarRegistry, options: &'a DecodeOptions) -> Self {
        Self {
            registry,
            options,
            simplified: HashMap::new(),
        }
    }

    fn decode_line(&mut self, line: &str, line_no: usize) -> Result<Option<TelegramLine>> {
        let chars: Vec<char> = line.chars().collect();
        if chars.len() < HEADER_WIDTH {
            return Err(Error::LengthMismatch {
                record_type: "header".to_string(),
                line: line_no,
                expected: HEADER_WIDTH,
                actual: chars.len(),
            });
        }

        let satzart: String = chars[TELHEADER_WIDTH..HEADER_WIDTH].iter().collect();
        let (record_type, version) = split_satzart(&satzart)
            .ok_or_else(|| Error::unknown_record_type(satzart.trim(), line_no))?;

        if self.options.ignored_types.contains(record_type) {
            trace!(record_type, line_no, "ignored record type");
            return Ok(None);
        }
        if let Some(allowed) = &self.options.allowed_types {
            if !allowed.contains(record_type) {
                return Err(Error::unknown_record_type(record_type, line_no));
            }
        }

        let registry = self.registry;
        let grammar = registry
            .grammar(record_type)
            .ok_or_else(|| Error::unknown_record_type(record_type, line_no))?;
        let chars = fit_length(chars, grammar, registry, line_no)?;

        let grammar: &Grammar = if self.options.use_simplified_grammar {
            self.simplified
                .entry(record_type.to_string())
                .or_insert_with(|| grammar.simplified())
        } else {
            grammar
        };

        let mut fields = GenericRecord::new();
        let mut offset = 0;
        for field in &grammar.fields {
            let raw: String = chars[offset..offset + field.width].iter().collect();
            offset += field.width;
            let value = decode_value(&raw, field).map_err(|e| e.at_line(line_no))?;
            fields.insert(field.name.clone(), value);
        }

        Ok(Some(TelegramLine {
            record_type: record_type.to_string(),
            version: version.to_string(),
            line_no,
            header: TelegramHeader::from_fields(&fields),
            fields,
        }))
    }
}

/// Bring a line to its grammar's width, applying the registered tolerances.
fn fit_length(
    mut chars: Vec<char>,
    grammar: &Grammar,
    registry: &GrammarRegistry,
    line_no: usize,
) -> Result<Vec<char>> {
    let expected = grammar.width();
    let actual = chars.len();
    if actual == expected {
        return Ok(chars);
    }

    let record_type = grammar.record_type.as_str();
    let tolerance = registry.tolerance();
    if tolerance.allows_off_by_one(record_type) && actual.abs_diff(expected) == 1 {
        warn!(record_type, line_no, expected, actual, "line length off by one");
        chars.resize(expected, ' ');
        return Ok(chars);
    }

    if actual > expected {
        let repaired = tolerance
            .non_ascii_field(record_type)
            .and_then(|field| strip_non_ascii(&chars, grammar, field, expected));
        if let Some(repaired) = repaired {
            warn!(record_type, line_no, "stripped mis-encoded characters");
            return Ok(repaired);
        }
    }

    Err(Error::LengthMismatch {
        record_type: record_type.to_string(),
        line: line_no,
        expected,
        actual,
    })
}

/// Repair a line inflated by multi-byte text in `field`.
///
/// The field's region is taken as everything between its offset and the
/// fixed-width tail; non-ASCII characters are dropped from the last word of
/// its content, which is then padded back to the field width.
fn strip_non_ascii(
    chars: &[char],
    grammar: &Grammar,
    field: &str,
    expected: usize,
) -> Option<Vec<char>> {
    let (offset, width) = grammar.field_span(field)?;
    let tail = expected - offset - width;
    let end = chars.len().checked_sub(tail)?;
    if end < offset {
        return None;
    }

    let region: String = chars[offset..end].iter().collect();
    let content = region.trim_end();
    let (head, last_word) = match content.rfind(' ') {
        Some(pos) => content.split_at(pos + 1),
        None => ("", content),
    };
    let mut repaired: Vec<char> = head
        .chars()
        .chain(last_word.chars().filter(char::is_ascii))
        .collect();
    if repaired.len() > width {
        return None;
    }
    repaired.resize(width, ' ');

    let mut line = Vec::with_capacity(expected);
    line.extend_from_slice(&chars[..offset]);
    line.extend(repaired);
    line.extend_from_slice(&chars[end..]);
    (line.len() == expected).then_some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wamas_grammar::{FieldSpec, RegistryBuilder};
    use wamas_grammar::header::{Direction, with_header};
    use wamas_record::Value;

    const HEADER: &str = "WAMAS     ODOO      00000120230501085723";

    fn registry() -> GrammarRegistry {
        RegistryBuilder::new()
            .with_grammar(with_header(
                "TEST",
                "TEST00050",
                Direction::Inbound,
                vec![
                    FieldSpec::string("Name", 6),
                    FieldSpec::integer("Qty", 3),
                    FieldSpec::string("Tail", 2),
                ],
            ))
            .with_grammar(with_header(
                "LOOSE",
                "LOOSE0050",
                Direction::Inbound,
                vec![FieldSpec::string("Name", 6), FieldSpec::string("End", 2)],
            ))
            .with_off_by_one("LOOSE")
            .with_non_ascii_repair("TEST", "Name")
            .build()
    }

    fn header(satzart: &str) -> String {
        format!("{HEADER}{satzart}")
    }

    #[test]
    fn test_decode_typed_line() {
        let input = format!("{}Apfel 012ZZ\n", header("TEST00050"));
        let telegram = decode_stream(input.as_bytes(), &registry(), &DecodeOptions::default())
            .unwrap();
        let line = &telegram.lines("TEST")[0];
        assert_eq!(line.version, "00050");
        assert_eq!(line.header.source, "WAMAS");
        assert_eq!(line.header.sequence, 1);
        assert_eq!(line.fields.get("Name"), Some(&Value::from("Apfel")));
        assert_eq!(line.fields.get("Qty"), Some(&Value::Integer(12)));
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let input = format!("\r\n{}Apfel 012ZZ\r\n\n", header("TEST00050"));
        let telegram = decode_stream(input.as_bytes(), &registry(), &DecodeOptions::default())
            .unwrap();
        assert_eq!(telegram.len(), 1);
        assert_eq!(telegram.lines("TEST")[0].line_no, 2);
    }

    #[test]
    fn test_unknown_type() {
        let input = format!("{}Apfel 012ZZ", header("NOPE00050"));
        let err = decode_stream(input.as_bytes(), &registry(), &DecodeOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownRecordType { record_type, line: 1 } if record_type == "NOPE"
        ));
    }

    #[test]
    fn test_allowed_types_filter() {
        let input = format!("{}Apfel 012ZZ", header("TEST00050"));
        let options = DecodeOptions::default().with_allowed_types(["LOOSE"]);
        assert!(matches!(
            decode_stream(input.as_bytes(), &registry(), &options),
            Err(Error::UnknownRecordType { .. })
        ));
    }

    #[test]
    fn test_ignored_types_are_skipped() {
        let input = format!("{}Apfel 012ZZ\n{}xx", header("TEST00050"), header("TOURQ0050"));
        let telegram = decode_stream(input.as_bytes(), &registry(), &DecodeOptions::default())
            .unwrap();
        assert_eq!(telegram.len(), 1);
    }

    #[test]
    fn test_length_mismatch() {
        let input = format!("{}Apfel 012Z", header("TEST00050"));
        let err = decode_stream(input.as_bytes(), &registry(), &DecodeOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch { expected: 60, actual: 59, .. }
        ));
    }

    #[test]
    fn test_off_by_one_short_and_long() {
        let short = format!("{}Apfel E", header("LOOSE0050"));
        let telegram = decode_stream(short.as_bytes(), &registry(), &DecodeOptions::default())
            .unwrap();
        assert_eq!(telegram.lines("LOOSE")[0].fields.get("End"), Some(&Value::from("E")));

        let long = format!("{}Apfel ENX", header("LOOSE0050"));
        let telegram = decode_stream(long.as_bytes(), &registry(), &DecodeOptions::default())
            .unwrap();
        assert_eq!(telegram.lines("LOOSE")[0].fields.get("End"), Some(&Value::from("EN")));

        let off_by_two = format!("{}Apfel ENXY", header("LOOSE0050"));
        assert!(
            decode_stream(off_by_two.as_bytes(), &registry(), &DecodeOptions::default()).is_err()
        );
    }

    #[test]
    fn test_non_ascii_repair() {
        // "Café" written as UTF-8 reads as five Latin-1 characters
        let mut input = header("TEST00050").into_bytes();
        input.extend_from_slice("Café  012ZZ".as_bytes());
        let telegram = decode_stream(&input, &registry(), &DecodeOptions::default()).unwrap();
        let line = &telegram.lines("TEST")[0];
        assert_eq!(line.fields.get("Name"), Some(&Value::from("Caf")));
        assert_eq!(line.fields.get("Qty"), Some(&Value::Integer(12)));
    }

    #[test]
    fn test_simplified_grammar_reads_text() {
        let input = format!("{}Apfel 012ZZ", header("TEST00050"));
        let options = DecodeOptions::default().with_simplified_grammar(true);
        let telegram = decode_stream(input.as_bytes(), &registry(), &options).unwrap();
        let line = &telegram.lines("TEST")[0];
        assert_eq!(line.fields.get("Qty"), Some(&Value::from("012")));
        assert_eq!(line.header.sequence, 1);
    }

    #[test]
    fn test_bad_integer_reports_line() {
        let input = format!("{}Apfel 0x2ZZ", header("TEST00050"));
        let err = decode_stream(input.as_bytes(), &registry(), &DecodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::ValueFormat { line: 1, field, .. } if field == "Qty"));
    }
}
