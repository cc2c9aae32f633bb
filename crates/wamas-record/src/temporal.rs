//! Date and time parsing shared by the codec and the template helpers.
//!
//! WAMAS partners send dates in whatever shape their ERP prints them, so the
//! parser accepts ISO and compact forms, day-first numeric forms, and textual
//! month names in English, German, French and Italian.

use crate::value::Value;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

/// Zone WAMAS wire times are expressed in
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Zurich;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%Y.%m.%d",
];

const MONTH_NAMES: &[(&str, u32)] = &[
    // English
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
    // German
    ("januar", 1),
    ("janner", 1),
    ("februar", 2),
    ("marz", 3),
    ("mai", 5),
    ("juni", 6),
    ("juli", 7),
    ("oktober", 10),
    ("dezember", 12),
    // French
    ("janvier", 1),
    ("fevrier", 2),
    ("mars", 3),
    ("avril", 4),
    ("juin", 6),
    ("juillet", 7),
    ("aout", 8),
    ("septembre", 9),
    ("octobre", 10),
    ("novembre", 11),
    ("decembre", 12),
    // Italian
    ("gennaio", 1),
    ("febbraio", 2),
    ("marzo", 3),
    ("aprile", 4),
    ("maggio", 5),
    ("giugno", 6),
    ("luglio", 7),
    ("agosto", 8),
    ("settembre", 9),
    ("ottobre", 10),
    ("dicembre", 12),
];

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\p{L}+|\d+").expect("token pattern is valid")
});

/// A parsed point in time: either a bare date or a naive date-time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temporal {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Temporal {
    /// Interpret a record value as a date or date-time.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Date(d) => Some(Temporal::Date(*d)),
            Value::DateTime(dt) => Some(Temporal::DateTime(*dt)),
            Value::String(s) => parse_temporal(s),
            _ => None,
        }
    }

    /// Calendar date part
    pub fn date(self) -> NaiveDate {
        match self {
            Temporal::Date(d) => d,
            Temporal::DateTime(dt) => dt.date(),
        }
    }

    /// Date-time view; bare dates sit at midnight
    pub fn datetime(self) -> NaiveDateTime {
        match self {
            Temporal::Date(d) => d.and_time(NaiveTime::MIN),
            Temporal::DateTime(dt) => dt,
        }
    }

    /// Shift by a duration, keeping the variant.
    pub fn shifted(self, delta: Duration) -> Self {
        match self {
            Temporal::Date(d) => Temporal::Date((d.and_time(NaiveTime::MIN) + delta).date()),
            Temporal::DateTime(dt) => Temporal::DateTime(dt + delta),
        }
    }
}

impl From<Temporal> for Value {
    fn from(value: Temporal) -> Self {
        match value {
            Temporal::Date(d) => Value::Date(d),
            Temporal::DateTime(dt) => Value::DateTime(dt),
        }
    }
}

/// Parse free-form date or date-time text.
///
/// Returns `None` when no supported shape matches. Offsets in RFC 3339 input
/// are normalised to UTC.
pub fn parse_temporal(text: &str) -> Option<Temporal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if text.bytes().all(|b| b.is_ascii_digit()) {
        return parse_compact(text);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Temporal::DateTime(dt.naive_utc()));
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Temporal::DateTime(dt));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, format) {
            return Some(Temporal::Date(d));
        }
    }

    let parsed = parse_textual(text);
    if parsed.is_none() {
        trace!(text, "no date shape matched");
    }
    parsed
}

fn parse_compact(text: &str) -> Option<Temporal> {
    let num = |range: std::ops::Range<usize>| text.get(range)?.parse::<u32>().ok();
    let year = i32::try_from(num(0..4)?).ok()?;
    let date = NaiveDate::from_ymd_opt(year, num(4..6)?, num(6..8)?)?;
    match text.len() {
        8 => Some(Temporal::Date(date)),
        12 => Some(Temporal::DateTime(date.and_hms_opt(num(8..10)?, num(10..12)?, 0)?)),
        14 => Some(Temporal::DateTime(
            date.and_hms_opt(num(8..10)?, num(10..12)?, num(12..14)?)?,
        )),
        _ => None,
    }
}

fn parse_textual(text: &str) -> Option<Temporal> {
    let mut month = None;
    let mut numbers = Vec::new();

    for token in TOKEN_RE.find_iter(text).map(|m| m.as_str()) {
        if let Ok(n) = token.parse::<u32>() {
            numbers.push((n, token.len()));
        } else if let Some(m) = month_from_name(token) {
            if month.replace(m).is_some() {
                return None;
            }
        }
    }

    let month = month?;
    let [first, second] = numbers.as_slice() else {
        return None;
    };
    let (day, year) = if first.1 == 4 || first.0 > 31 {
        (second.0, first.0)
    } else {
        (first.0, second.0)
    };
    let year = i32::try_from(year).ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(Temporal::Date)
}

fn month_from_name(token: &str) -> Option<u32> {
    let folded = fold_accents(&token.to_lowercase());
    if folded.chars().count() < 3 {
        return None;
    }
    let mut found = None;
    for (name, month) in MONTH_NAMES {
        if *name == folded || name.starts_with(&folded) {
            match found {
                Some(existing) if existing != *month => return None,
                _ => found = Some(*month),
            }
        }
    }
    found
}

fn fold_accents(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Interpret `dt` as UTC and express it in `tz`.
pub fn utc_to_local(dt: NaiveDateTime, tz: Tz) -> NaiveDateTime {
    tz.from_utc_datetime(&dt).naive_local()
}

/// Interpret `dt` as wall-clock time in `tz` and express it in UTC.
///
/// Ambiguous times resolve to the earlier instant; times skipped by a DST
/// transition are moved forward by one hour.
pub fn local_to_utc(dt: NaiveDateTime, tz: Tz) -> NaiveDateTime {
    tz.from_local_datetime(&dt)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(dt + Duration::hours(1))).earliest())
        .map_or(dt, |local| local.naive_utc())
}
