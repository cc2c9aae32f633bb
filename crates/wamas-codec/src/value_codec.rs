//! Rendering of single values into fixed-width fields and back.
//!
//! | kind     | encode                                   | decode                 |
//! |----------|------------------------------------------|------------------------|
//! | string   | left aligned, space padded, truncated    | trailing spaces cut    |
//! | integer  | right aligned, zero padded, sign first   | integer or null        |
//! | float    | implicit decimal point, zero padded      | decimal or null        |
//! | date     | `YYYYMMDD`                               | trimmed text           |
//! | datetime | `YYYYMMDDHHMMSS`, optionally zone-shifted | trimmed text           |
//! | boolean  | `J` / `N`                                | bool, other tokens kept |

use crate::{Error, Result};
use chrono_tz::Tz;
use wamas_grammar::{FieldSpec, ValueKind};
use wamas_record::temporal::utc_to_local;
use wamas_record::{Temporal, Value, format_decimal};

/// Render `value` into exactly `spec.width` characters.
///
/// With `timezone` set, date-time values are read as UTC and written as
/// wall-clock time in that zone. Dates are never shifted.
///
/// # Errors
///
/// Returns [`Error::ValueFormat`] when the value cannot be represented in the
/// field's kind.
pub fn encode_value(value: &Value, spec: &FieldSpec, timezone: Option<Tz>) -> Result<String> {
    match spec.kind {
        ValueKind::String => Ok(fit_left(&value.to_text(), spec.width)),
        ValueKind::Integer => encode_integer(value, spec),
        ValueKind::Float => encode_float(value, spec),
        ValueKind::Date => encode_date(value, spec),
        ValueKind::DateTime => encode_datetime(value, spec, timezone),
        ValueKind::Boolean => encode_boolean(value, spec),
    }
}

/// Parse the raw text of one field.
///
/// # Errors
///
/// Returns [`Error::ValueFormat`] when a numeric field holds something other
/// than digits.
pub fn decode_value(raw: &str, spec: &FieldSpec) -> Result<Value> {
    match spec.kind {
        ValueKind::String => Ok(Value::String(raw.trim_end().to_string())),
        ValueKind::Integer => {
            let text = raw.trim();
            if text.is_empty() {
                return Ok(Value::Null);
            }
            text.parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| Error::value_format(&spec.name, spec.kind, raw, e.to_string()))
        }
        ValueKind::Float => decode_float(raw, spec),
        ValueKind::Date | ValueKind::DateTime => {
            let text = raw.trim();
            Ok(if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            })
        }
        ValueKind::Boolean => Ok(match raw.trim() {
            "" => Value::Null,
            "J" => Value::Bool(true),
            "N" => Value::Bool(false),
            other => Value::String(other.to_string()),
        }),
    }
}

fn blank_text(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Left-align `text` in `width` characters.
fn fit_left(text: &str, width: usize) -> String {
    let mut out: String = text.chars().take(width).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat_n(' ', width - len));
    out
}

/// Left-pad with zeros up to `width`; longer input is left untouched.
fn zero_fill(digits: &str, width: usize) -> String {
    let len = digits.chars().count();
    if len >= width {
        return digits.to_string();
    }
    let mut out = "0".repeat(width - len);
    out.push_str(digits);
    out
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Put the sign in front of the zero padding, inside the field width.
fn signed(body: &str, negative: bool, width: usize) -> String {
    if negative {
        let inner = width.saturating_sub(1);
        format!("-{}", truncate(&zero_fill(body, inner), inner))
    } else {
        truncate(&zero_fill(body, width), width)
    }
}

fn encode_integer(value: &Value, spec: &FieldSpec) -> Result<String> {
    let number = if blank_text(value) {
        0
    } else {
        value.as_i64().ok_or_else(|| {
            Error::value_format(&spec.name, spec.kind, value.to_text(), "not an integer")
        })?
    };
    Ok(signed(
        &number.unsigned_abs().to_string(),
        number < 0,
        spec.width,
    ))
}

fn encode_float(value: &Value, spec: &FieldSpec) -> Result<String> {
    let number = if blank_text(value) {
        0.0
    } else {
        value.as_f64().ok_or_else(|| {
            Error::value_format(&spec.name, spec.kind, value.to_text(), "not a number")
        })?
    };
    if !number.is_finite() {
        return Err(Error::value_format(
            &spec.name,
            spec.kind,
            value.to_text(),
            "not a finite number",
        ));
    }

    let negative = number < 0.0;
    let width = if negative {
        spec.width.saturating_sub(1)
    } else {
        spec.width
    };
    let dp = spec.decimal_places;
    let text = format_decimal(number.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((&text, ""));

    let mut digits = zero_fill(whole, width.saturating_sub(dp));
    digits.push_str(fraction);
    let fraction_len = fraction.chars().count();
    if fraction_len < dp {
        digits.push_str(&"0".repeat(dp - fraction_len));
    }
    let body = truncate(&digits, width);
    Ok(if negative { format!("-{body}") } else { body })
}

fn decode_float(raw: &str, spec: &FieldSpec) -> Result<Value> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(Value::Null);
    }
    let invalid = |reason: &str| Error::value_format(&spec.name, spec.kind, raw, reason);
    if !text.is_ascii() {
        return Err(invalid("not a number"));
    }

    let dp = spec.decimal_places;
    let literal = if dp == 0 {
        text.to_string()
    } else {
        let (sign, digits) = match text.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", text),
        };
        let digits = zero_fill(digits, dp + 1);
        let (whole, fraction) = digits.split_at(digits.len() - dp);
        format!("{sign}{whole}.{fraction}")
    };
    literal
        .parse::<f64>()
        .map(Value::Decimal)
        .map_err(|_| invalid("not a number"))
}

fn temporal(value: &Value, spec: &FieldSpec) -> Result<Temporal> {
    let parsed = match value {
        Value::Integer(i) => wamas_record::parse_temporal(&i.to_string()),
        other => Temporal::from_value(other),
    };
    parsed.ok_or_else(|| {
        Error::value_format(&spec.name, spec.kind, value.to_text(), "not a date")
    })
}

fn encode_date(value: &Value, spec: &FieldSpec) -> Result<String> {
    if blank_text(value) {
        return Ok(" ".repeat(spec.width));
    }
    let date = temporal(value, spec)?.date();
    Ok(fit_left(&date.format("%Y%m%d").to_string(), spec.width))
}

fn encode_datetime(value: &Value, spec: &FieldSpec, timezone: Option<Tz>) -> Result<String> {
    if blank_text(value) {
        return Ok(" ".repeat(spec.width));
    }
    let mut dt = temporal(value, spec)?.datetime();
    if let Some(tz) = timezone {
        dt = utc_to_local(dt, tz);
    }
    Ok(fit_left(&dt.format("%Y%m%d%H%M%S").to_string(), spec.width))
}

fn encode_boolean(value: &Value, spec: &FieldSpec) -> Result<String> {
    let token = match value {
        Value::Null => "N",
        Value::Bool(true) => "J",
        Value::Bool(false) => "N",
        Value::Integer(i) => {
            if *i != 0 {
                "J"
            } else {
                "N"
            }
        }
        Value::String(s) => match s.trim() {
            "" | "N" => "N",
            "J" => "J",
            other => match other.to_lowercase().as_str() {
                "true" | "t" | "1" | "yes" | "y" | "ja" | "j" => "J",
                "false" | "f" | "0" | "no" | "n" | "nein" => "N",
                _ => {
                    return Err(Error::value_format(
                        &spec.name,
                        spec.kind,
                        other,
                        "expected J or N",
                    ));
                }
            },
        },
        other => {
            return Err(Error::value_format(
                &spec.name,
                spec.kind,
                other.to_text(),
                "expected J or N",
            ));
        }
    };
    Ok(fit_left(token, spec.width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use wamas_record::DEFAULT_TIMEZONE;

    fn enc(value: impl Into<Value>, spec: &FieldSpec) -> String {
        encode_value(&value.into(), spec, None).unwrap()
    }

    #[test]
    fn test_string_pads_and_truncates() {
        let spec = FieldSpec::string("s", 6);
        assert_eq!(enc("abc", &spec), "abc   ");
        assert_eq!(enc("abcdefgh", &spec), "abcdef");
        assert_eq!(enc("Käse", &spec), "Käse  ");
        assert_eq!(enc(Value::Null, &spec), "      ");
    }

    #[test]
    fn test_integer_encoding() {
        let spec = FieldSpec::integer("i", 6);
        assert_eq!(enc(42i64, &spec), "000042");
        assert_eq!(enc(-42i64, &spec), "-00042");
        assert_eq!(enc("17", &spec), "000017");
        assert_eq!(enc(Value::Null, &spec), "000000");
        assert_eq!(enc(3.9, &spec), "000003");
    }

    #[test]
    fn test_integer_rejects_text() {
        let spec = FieldSpec::integer("i", 6);
        let err = encode_value(&Value::from("abc"), &spec, None).unwrap_err();
        assert!(matches!(err, Error::ValueFormat { field, .. } if field == "i"));
    }

    #[test]
    fn test_float_encoding() {
        let spec = FieldSpec::float("f", 9, 3);
        assert_eq!(enc(3.6, &spec), "000003600");
        assert_eq!(enc(-3.6, &spec), "-00003600");
        assert_eq!(enc(0.125, &spec), "000000125");
        assert_eq!(enc(12i64, &spec), "000012000");
        assert_eq!(enc("2.5", &spec), "000002500");
        assert_eq!(enc(Value::Null, &spec), "000000000");
    }

    #[test]
    fn test_float_extra_decimals_are_truncated() {
        let spec = FieldSpec::float("f", 6, 2);
        assert_eq!(enc(1.239, &spec), "000123");
    }

    #[test]
    fn test_float_decoding() {
        let spec = FieldSpec::float("f", 9, 3);
        assert_eq!(decode_value("000003600", &spec).unwrap(), Value::Decimal(3.6));
        assert_eq!(decode_value("-00003600", &spec).unwrap(), Value::Decimal(-3.6));
        assert_eq!(decode_value("         ", &spec).unwrap(), Value::Null);
        assert!(decode_value("00000x600", &spec).is_err());
    }

    #[test]
    fn test_date_and_datetime() {
        let date = FieldSpec::date("d", 8);
        let day = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        assert_eq!(enc(day, &date), "20230501");
        assert_eq!(enc("2023-05-01", &date), "20230501");
        assert_eq!(enc(Value::Null, &date), "        ");

        let datetime = FieldSpec::datetime("t", 14);
        let moment =
            NaiveDateTime::parse_from_str("2023-05-01 06:57:23", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(enc(moment, &datetime), "20230501065723");
        assert_eq!(
            encode_value(&moment.into(), &datetime, Some(DEFAULT_TIMEZONE)).unwrap(),
            "20230501085723"
        );
    }

    #[test]
    fn test_dates_ignore_timezone() {
        let date = FieldSpec::date("d", 8);
        assert_eq!(
            encode_value(&Value::from("2023-05-01 23:30:00"), &date, Some(DEFAULT_TIMEZONE))
                .unwrap(),
            "20230501"
        );
    }

    #[test]
    fn test_date_rejects_garbage() {
        let date = FieldSpec::date("d", 8);
        assert!(encode_value(&Value::from("soon"), &date, None).is_err());
    }

    #[test]
    fn test_boolean() {
        let spec = FieldSpec::boolean("b", 1);
        assert_eq!(enc(true, &spec), "J");
        assert_eq!(enc(false, &spec), "N");
        assert_eq!(enc(Value::Null, &spec), "N");
        assert_eq!(enc("J", &spec), "J");
        assert_eq!(enc("yes", &spec), "J");
        assert_eq!(enc("Nein", &spec), "N");
        assert!(encode_value(&Value::from("maybe"), &spec, None).is_err());

        assert_eq!(decode_value("J", &spec).unwrap(), Value::Bool(true));
        assert_eq!(decode_value("N", &spec).unwrap(), Value::Bool(false));
        assert_eq!(decode_value("X", &spec).unwrap(), Value::from("X"));
    }

    #[test]
    fn test_decode_text_kinds() {
        assert_eq!(
            decode_value("abc   ", &FieldSpec::string("s", 6)).unwrap(),
            Value::from("abc")
        );
        assert_eq!(
            decode_value("20230501", &FieldSpec::date("d", 8)).unwrap(),
            Value::from("20230501")
        );
        assert_eq!(
            decode_value("000042", &FieldSpec::integer("i", 6)).unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            decode_value("      ", &FieldSpec::integer("i", 6)).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_values_survive_a_round_trip() {
        let cases = [
            (FieldSpec::string("s", 10), Value::from("Bergkäse")),
            (FieldSpec::integer("i", 5), Value::Integer(-12)),
            (FieldSpec::float("f", 12, 3), Value::Decimal(5184.25)),
            (FieldSpec::boolean("b", 1), Value::Bool(true)),
        ];
        for (spec, value) in cases {
            let encoded = encode_value(&value, &spec, None).unwrap();
            assert_eq!(encoded.chars().count(), spec.width);
            assert_eq!(decode_value(&encoded, &spec).unwrap(), value, "{}", spec.name);
        }
    }
}
