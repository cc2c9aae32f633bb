//! Telegram header shared by every record type

use crate::model::{DefaultFn, FieldSpec, Grammar};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

/// Width of the telegram header proper (source, destination, sequence, timestamp)
pub const TELHEADER_WIDTH: usize = 40;

/// Width of the `Satzart` record-type field following the header
pub const SATZART_WIDTH: usize = 9;

/// Characters needed to identify a line's record type
pub const HEADER_WIDTH: usize = TELHEADER_WIDTH + SATZART_WIDTH;

pub const FIELD_SOURCE: &str = "Telheader_Quelle";
pub const FIELD_DESTINATION: &str = "Telheader_Ziel";
pub const FIELD_SEQUENCE: &str = "Telheader_TelSeq";
pub const FIELD_CREATED_AT: &str = "Telheader_AnlZeit";
pub const FIELD_SATZART: &str = "Satzart";

static SATZART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]+)(\d+)").expect("satzart pattern is valid"));

/// Which side writes the telegram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// ERP to warehouse (master data, orders)
    Outbound,
    /// Warehouse to ERP (confirmations)
    Inbound,
}

/// Header fields for a record type, ending with its literal `Satzart`.
pub fn header_fields(satzart: &str, direction: Direction) -> Vec<FieldSpec> {
    let (source, destination) = match direction {
        Direction::Outbound => (DefaultFn::ErpSystem, DefaultFn::WamasSystem),
        Direction::Inbound => (DefaultFn::WamasSystem, DefaultFn::ErpSystem),
    };
    vec![
        FieldSpec::string(FIELD_SOURCE, 10).with_default_fn(source),
        FieldSpec::string(FIELD_DESTINATION, 10).with_default_fn(destination),
        FieldSpec::integer(FIELD_SEQUENCE, 6).with_default_fn(DefaultFn::SequenceNumber),
        FieldSpec::datetime(FIELD_CREATED_AT, 14).with_default_fn(DefaultFn::CurrentDatetime),
        FieldSpec::string(FIELD_SATZART, SATZART_WIDTH).with_default(satzart),
    ]
}

/// Grammar used to read the header of any line before its type is known.
pub fn header_grammar() -> Grammar {
    Grammar::new("HEADER", header_fields("", Direction::Inbound))
}

/// Build a full line grammar: header followed by body fields.
pub fn with_header(
    record_type: &str,
    satzart: &str,
    direction: Direction,
    body: Vec<FieldSpec>,
) -> Grammar {
    let mut fields = header_fields(satzart, direction);
    fields.extend(body);
    Grammar::new(record_type, fields)
}

/// Split a `Satzart` value into record-type prefix and numeric suffix.
///
/// `"WATEPQ051"` gives `("WATEPQ", "051")`.
pub fn split_satzart(satzart: &str) -> Option<(&str, &str)> {
    let captures = SATZART_RE.captures(satzart.trim())?;
    Some((captures.get(1)?.as_str(), captures.get(2)?.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_widths() {
        let grammar = header_grammar();
        assert_eq!(grammar.width(), HEADER_WIDTH);
        assert_eq!(grammar.field_span(FIELD_SATZART), Some((TELHEADER_WIDTH, SATZART_WIDTH)));
    }

    #[test]
    fn test_split_satzart() {
        assert_eq!(split_satzart("WATEPQ051"), Some(("WATEPQ", "051")));
        assert_eq!(split_satzart("KST000052"), Some(("KST", "000052")));
        assert_eq!(split_satzart("ARTEAN052"), Some(("ARTEAN", "052")));
        assert_eq!(split_satzart("nothing"), None);
        assert_eq!(split_satzart("ABC"), None);
    }

    #[test]
    fn test_direction_swaps_systems() {
        let outbound = header_fields("KST000052", Direction::Outbound);
        let inbound = header_fields("WEAKQ0050", Direction::Inbound);
        assert_eq!(outbound[0].default_fn, Some(DefaultFn::ErpSystem));
        assert_eq!(inbound[0].default_fn, Some(DefaultFn::WamasSystem));
        assert_eq!(outbound[4].default.as_deref(), Some("KST000052"));
    }
}
