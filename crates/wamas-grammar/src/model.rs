//! Grammar model definitions

use chrono::Duration;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;

/// Wire kind of a fixed-width field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Date,
    DateTime,
    Boolean,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Date => "date",
            ValueKind::DateTime => "datetime",
            ValueKind::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// UBL party an address default reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    DeliveryCustomer,
    DespatchSupplier,
}

impl Party {
    /// Element name of the party below `DespatchAdvice`
    pub fn element(self) -> &'static str {
        match self {
            Party::DeliveryCustomer => "cac:DeliveryCustomerParty",
            Party::DespatchSupplier => "cac:DespatchSupplierParty",
        }
    }
}

/// Unit of a date offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl Interval {
    /// Duration of `amount` units
    pub fn duration(self, amount: i64) -> Duration {
        match self {
            Interval::Weeks => Duration::weeks(amount),
            Interval::Days => Duration::days(amount),
            Interval::Hours => Duration::hours(amount),
            Interval::Minutes => Duration::minutes(amount),
            Interval::Seconds => Duration::seconds(amount),
        }
    }
}

/// Named default functions a field may fall back to.
///
/// Each variant carries exactly the arguments it needs; the encoder binds
/// runtime state (line index, loop position, parent ids) when it evaluates
/// one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "fn", rename_all = "snake_case")]
pub enum DefaultFn {
    /// Identifier of the ERP side ("ODOO")
    ErpSystem,
    /// Identifier of the warehouse side ("WAMAS")
    WamasSystem,
    /// Running line number of the telegram being written
    SequenceNumber,
    /// Today in the configured zone
    CurrentDate,
    /// Now, UTC
    CurrentDatetime,
    /// Position inside the repeated group being encoded
    LoopIndex,
    /// Random digits filling the field width
    RandomDigits,
    /// Random number below 9999
    RandomNumber,
    /// Random quay label `QUAI-n`
    RandomQuai,
    /// Id captured from the parent record of the same telegram
    ParentId,
    /// Another output field of the same line, shifted by an interval
    DateFromField {
        field: String,
        amount: i64,
        unit: Interval,
    },
    /// N-th distinct name element of a party address
    AddressName { party: Party, rank: usize },
    /// Street line of a party address
    AddressStreet { party: Party },
}

/// Where a field's value is read from in the input record
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SourcePath {
    /// Single dotted path
    Direct(String),
    /// Several paths whose found values are joined with a space
    Alternatives(Vec<String>),
    /// Condition path → target path; the first present condition wins
    Conditional(IndexMap<String, String>),
}

impl SourcePath {
    /// Substitute the repetition placeholder in every path.
    ///
    /// With a group of more than one element `%s` becomes the index,
    /// otherwise the `.%s` segment is dropped.
    pub fn resolve_placeholder(&self, index: usize, group_len: usize) -> SourcePath {
        let fix = |path: &str| {
            if group_len > 1 {
                path.replace("%s", &index.to_string())
            } else {
                path.replace(".%s", "")
            }
        };
        match self {
            SourcePath::Direct(path) => SourcePath::Direct(fix(path)),
            SourcePath::Alternatives(paths) => {
                SourcePath::Alternatives(paths.iter().map(|p| fix(p)).collect())
            }
            SourcePath::Conditional(map) => {
                SourcePath::Conditional(map.iter().map(|(c, t)| (fix(c), fix(t))).collect())
            }
        }
    }
}

/// Definition of a single fixed-width field
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub width: usize,
    pub kind: ValueKind,
    #[serde(default)]
    pub decimal_places: usize,
    #[serde(default)]
    pub source: Option<SourcePath>,
    #[serde(default)]
    pub dict_key: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub default_fn: Option<DefaultFn>,
}

impl FieldSpec {
    /// Create a field with no value source
    pub fn new(name: impl Into<String>, kind: ValueKind, width: usize) -> Self {
        Self {
            name: name.into(),
            width,
            kind,
            decimal_places: 0,
            source: None,
            dict_key: None,
            default: None,
            default_fn: None,
        }
    }

    pub fn string(name: impl Into<String>, width: usize) -> Self {
        Self::new(name, ValueKind::String, width)
    }

    pub fn integer(name: impl Into<String>, width: usize) -> Self {
        Self::new(name, ValueKind::Integer, width)
    }

    pub fn float(name: impl Into<String>, width: usize, decimal_places: usize) -> Self {
        let mut spec = Self::new(name, ValueKind::Float, width);
        spec.decimal_places = decimal_places;
        spec
    }

    pub fn date(name: impl Into<String>, width: usize) -> Self {
        Self::new(name, ValueKind::Date, width)
    }

    pub fn datetime(name: impl Into<String>, width: usize) -> Self {
        Self::new(name, ValueKind::DateTime, width)
    }

    pub fn boolean(name: impl Into<String>, width: usize) -> Self {
        Self::new(name, ValueKind::Boolean, width)
    }

    /// Read the value from a dotted path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.source = Some(SourcePath::Direct(path.into()));
        self
    }

    /// Join the values found at several paths
    pub fn with_alternatives<S: AsRef<str>>(mut self, paths: &[S]) -> Self {
        self.source = Some(SourcePath::Alternatives(
            paths.iter().map(|p| p.as_ref().to_string()).collect(),
        ));
        self
    }

    /// Pick the target of the first condition path present in the input
    pub fn with_conditional<S: AsRef<str>>(mut self, pairs: &[(S, S)]) -> Self {
        self.source = Some(SourcePath::Conditional(
            pairs
                .iter()
                .map(|(c, t)| (c.as_ref().to_string(), t.as_ref().to_string()))
                .collect(),
        ));
        self
    }

    /// Read the value from a plain top-level key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.dict_key = Some(key.into());
        self
    }

    /// Literal fallback value
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Computed fallback value
    pub fn with_default_fn(mut self, default_fn: DefaultFn) -> Self {
        self.default_fn = Some(default_fn);
        self
    }
}

/// Ordered field layout of one record type, header fields included
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    pub record_type: String,
    pub fields: Vec<FieldSpec>,
}

impl Grammar {
    pub fn new(record_type: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            record_type: record_type.into(),
            fields,
        }
    }

    /// Exact line length
    pub fn width(&self) -> usize {
        self.fields.iter().map(|f| f.width).sum()
    }

    /// Find a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Character offset and width of a field
    pub fn field_span(&self, name: &str) -> Option<(usize, usize)> {
        let mut offset = 0;
        for field in &self.fields {
            if field.name == name {
                return Some((offset, field.width));
            }
            offset += field.width;
        }
        None
    }

    /// Same layout with every field read as untyped text.
    pub fn simplified(&self) -> Grammar {
        Grammar {
            record_type: self.record_type.clone(),
            fields: self
                .fields
                .iter()
                .map(|f| FieldSpec {
                    kind: ValueKind::String,
                    decimal_places: 0,
                    ..f.clone()
                })
                .collect(),
        }
    }
}
