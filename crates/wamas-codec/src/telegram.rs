use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;
use wamas_grammar::header::{
    FIELD_CREATED_AT, FIELD_DESTINATION, FIELD_SATZART, FIELD_SEQUENCE, FIELD_SOURCE,
};
use wamas_record::{GenericRecord, Value};

/// Common 49-character prefix of every telegram line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelegramHeader {
    pub source: String,
    pub destination: String,
    pub sequence: i64,
    pub created_at: String,
    pub satzart: String,
}

impl TelegramHeader {
    /// Read the header out of a decoded line.
    pub fn from_fields(fields: &GenericRecord) -> Self {
        let text = |name: &str| fields.get(name).map(Value::to_text).unwrap_or_default();
        Self {
            source: text(FIELD_SOURCE),
            destination: text(FIELD_DESTINATION),
            sequence: fields
                .get(FIELD_SEQUENCE)
                .and_then(Value::as_i64)
                .unwrap_or_default(),
            created_at: text(FIELD_CREATED_AT),
            satzart: text(FIELD_SATZART),
        }
    }
}

/// One decoded line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelegramLine {
    pub record_type: String,
    /// Numeric suffix of the `Satzart`, e.g. `051`
    pub version: String,
    /// 1-based position in the input stream
    pub line_no: usize,
    pub header: TelegramHeader,
    /// All fields, header fields included, in grammar order
    pub fields: GenericRecord,
}

/// Decoded telegram, grouped by record type in order of first appearance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Telegram {
    lines: IndexMap<String, Vec<TelegramLine>>,
}

impl Telegram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: TelegramLine) {
        self.lines
            .entry(line.record_type.clone())
            .or_default()
            .push(line);
    }

    /// Lines of one record type, empty if none were read
    pub fn lines(&self, record_type: &str) -> &[TelegramLine] {
        self.lines.get(record_type).map_or(&[], Vec::as_slice)
    }

    /// Record types in order of first appearance
    pub fn record_types(&self) -> impl Iterator<Item = &str> {
        self.lines.keys().map(String::as_str)
    }

    /// Set of record types present
    pub fn observed_types(&self) -> BTreeSet<String> {
        self.lines.keys().cloned().collect()
    }

    pub fn contains(&self, record_type: &str) -> bool {
        self.lines.contains_key(record_type)
    }

    /// Total number of lines
    pub fn len(&self) -> usize {
        self.lines.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TelegramLine> {
        self.lines.values().flatten()
    }

    /// Field records of one record type
    pub fn records(&self, record_type: &str) -> impl Iterator<Item = &GenericRecord> {
        self.lines(record_type).iter().map(|line| &line.fields)
    }

    /// Record type → list of field records, the dictionary view of a telegram
    pub fn to_record(&self) -> GenericRecord {
        self.lines
            .iter()
            .map(|(record_type, lines)| {
                let records = lines
                    .iter()
                    .map(|line| Value::Record(line.fields.clone()))
                    .collect::<Vec<_>>();
                (record_type.clone(), Value::List(records))
            })
            .collect()
    }
}
