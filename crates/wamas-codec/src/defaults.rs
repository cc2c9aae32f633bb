//! Evaluation of the named default functions

use crate::encoder::{EncodeOptions, LineContext, ParentIdRegistry};
use crate::{Error, Result};
use indexmap::IndexMap;
use rand::Rng;
use rand::rngs::StdRng;
use tracing::debug;
use wamas_grammar::{DefaultFn, FieldSpec, GrammarRegistry, Party};
use wamas_record::temporal::utc_to_local;
use wamas_record::{GenericRecord, Value, parse_temporal};

pub(crate) struct DefaultContext<'a> {
    pub input: &'a GenericRecord,
    /// Fields already written for the current line
    pub output: &'a IndexMap<String, String>,
    pub parent_ids: &'a ParentIdRegistry,
    pub registry: &'a GrammarRegistry,
    pub options: &'a EncodeOptions,
    pub line: &'a LineContext<'a>,
    pub field: &'a FieldSpec,
}

pub(crate) fn evaluate(
    default_fn: &DefaultFn,
    ctx: &DefaultContext<'_>,
    rng: &mut StdRng,
) -> Result<Value> {
    let value = match default_fn {
        DefaultFn::ErpSystem => Value::from(ctx.options.systems.erp.as_str()),
        DefaultFn::WamasSystem => Value::from(ctx.options.systems.wamas.as_str()),
        DefaultFn::SequenceNumber => Value::Integer(ctx.line.line_idx as i64),
        DefaultFn::CurrentDate => {
            let local = utc_to_local(ctx.options.now.naive_utc(), ctx.options.timezone);
            Value::Date(local.date())
        }
        DefaultFn::CurrentDatetime => Value::DateTime(ctx.options.now.naive_utc()),
        DefaultFn::LoopIndex => {
            Value::Integer(ctx.line.position.map_or(0, |p| p.index) as i64)
        }
        DefaultFn::RandomDigits => Value::String(random_digits(rng, ctx.field.width)),
        DefaultFn::RandomNumber => Value::Integer(rng.random_range(0..9999)),
        DefaultFn::RandomQuai => Value::String(format!("QUAI-{}", rng.random_range(1..=999))),
        DefaultFn::ParentId => parent_id(ctx)?,
        DefaultFn::DateFromField {
            field,
            amount,
            unit,
        } => ctx
            .output
            .get(field)
            .and_then(|written| parse_temporal(written))
            .map_or(Value::Null, |t| t.shifted(unit.duration(*amount)).into()),
        DefaultFn::AddressName { party, rank } => address_names(ctx.input, *party)
            .into_iter()
            .nth(*rank)
            .map_or(Value::Null, Value::String),
        DefaultFn::AddressStreet { party } => {
            address_street(ctx.input, *party).map_or(Value::Null, Value::String)
        }
    };
    Ok(value)
}

/// `width` random digits, the first one non-zero
fn random_digits(rng: &mut StdRng, width: usize) -> String {
    (0..width)
        .map(|i| {
            let digit = if i == 0 {
                rng.random_range(1..=9)
            } else {
                rng.random_range(0..=9)
            };
            char::from(b'0' + digit)
        })
        .collect()
}

fn parent_id(ctx: &DefaultContext<'_>) -> Result<Value> {
    let record_type = ctx.line.record_type_out;
    let field = ctx.field.name.as_str();
    let parent_field = ctx
        .registry
        .parent_key_for(record_type, field)
        .unwrap_or(field);
    match ctx.parent_ids.get(parent_field) {
        Some(id) => Ok(Value::from(id)),
        None => Err(Error::MissingParentId {
            record_type: record_type.to_string(),
            field: field.to_string(),
            parent_field: parent_field.to_string(),
        }),
    }
}

fn party_text(input: &GenericRecord, party: Party, path: &str) -> Option<String> {
    let full = format!("DespatchAdvice.{}.cac:Party.{path}", party.element());
    input
        .get_path(&full)
        .map(Value::to_text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Distinct name lines of a party address, most specific first.
///
/// The last distinct element is held back as the street line.
fn address_names(input: &GenericRecord, party: Party) -> Vec<String> {
    let candidates = [
        "cac:Contact.cbc:Name",
        "cac:PartyName.cbc:Name",
        "cac:PostalAddress.cbc:Department",
        "cac:PostalAddress.cbc:StreetName",
        "cac:PostalAddress.cbc:AdditionalStreetName",
    ];
    let mut names: Vec<String> = Vec::new();
    for text in candidates
        .iter()
        .filter_map(|path| party_text(input, party, path))
    {
        if !names.contains(&text) {
            names.push(text);
        }
    }
    names.pop();
    debug!(?party, count = names.len(), "address names collected");
    names
}

fn address_street(input: &GenericRecord, party: Party) -> Option<String> {
    [
        "cac:PostalAddress.cbc:AdditionalStreetName",
        "cac:PostalAddress.cbc:StreetName",
        "cac:PostalAddress.cbc:Department",
    ]
    .iter()
    .find_map(|path| party_text(input, party, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rand::SeedableRng;
    use wamas_grammar::Interval;

    struct Fixture {
        input: GenericRecord,
        output: IndexMap<String, String>,
        parent_ids: ParentIdRegistry,
        registry: GrammarRegistry,
        options: EncodeOptions,
        field: FieldSpec,
    }

    impl Fixture {
        fn new(input: GenericRecord) -> Self {
            Self {
                input,
                output: IndexMap::new(),
                parent_ids: ParentIdRegistry::new(),
                registry: GrammarRegistry::builtin(),
                options: EncodeOptions::default()
                    .with_now(Utc.with_ymd_and_hms(2023, 12, 31, 23, 30, 0).unwrap()),
                field: FieldSpec::string("Field", 8),
            }
        }

        fn eval(&self, default_fn: DefaultFn, record_type: &str) -> Result<Value> {
            let line = LineContext {
                line_idx: 3,
                position: None,
                record_type_out: record_type,
                convert_tz: true,
            };
            let ctx = DefaultContext {
                input: &self.input,
                output: &self.output,
                parent_ids: &self.parent_ids,
                registry: &self.registry,
                options: &self.options,
                line: &line,
                field: &self.field,
            };
            evaluate(&default_fn, &ctx, &mut StdRng::seed_from_u64(1))
        }
    }

    fn despatch() -> GenericRecord {
        GenericRecord::from_json_str(
            r#"{"DespatchAdvice": {"cac:DeliveryCustomerParty": {"cac:Party": {
                "cac:PartyName": {"cbc:Name": "Hofladen Meier"},
                "cac:Contact": {"cbc:Name": "Anna Meier"},
                "cac:PostalAddress": {
                    "cbc:Department": "Hofladen Meier",
                    "cbc:StreetName": "Dorfstrasse 4"
                }
            }}}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_current_date_is_local() {
        let fixture = Fixture::new(GenericRecord::new());
        assert_eq!(
            fixture.eval(DefaultFn::CurrentDate, "X").unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        assert_eq!(
            fixture.eval(DefaultFn::SequenceNumber, "X").unwrap(),
            Value::Integer(3)
        );
    }

    #[test]
    fn test_random_defaults() {
        let fixture = Fixture::new(GenericRecord::new());
        let digits = fixture.eval(DefaultFn::RandomDigits, "X").unwrap().to_text();
        assert_eq!(digits.len(), 8);
        assert!(!digits.starts_with('0'));

        let quai = fixture.eval(DefaultFn::RandomQuai, "X").unwrap().to_text();
        let n: u32 = quai.strip_prefix("QUAI-").unwrap().parse().unwrap();
        assert!((1..=999).contains(&n));

        let number = fixture.eval(DefaultFn::RandomNumber, "X").unwrap();
        assert!(matches!(number, Value::Integer(n) if (0..9999).contains(&n)));
    }

    #[test]
    fn test_date_from_written_field() {
        let mut fixture = Fixture::new(GenericRecord::new());
        fixture
            .output
            .insert("Telheader_AnlZeit".to_string(), "20230501085723".to_string());
        let value = fixture
            .eval(
                DefaultFn::DateFromField {
                    field: "Telheader_AnlZeit".into(),
                    amount: 2,
                    unit: Interval::Days,
                },
                "X",
            )
            .unwrap();
        assert_eq!(value.to_text(), "2023-05-03 08:57:23");
    }

    #[test]
    fn test_parent_id_lookup() {
        let mut fixture = Fixture::new(GenericRecord::new());
        fixture.field = FieldSpec::string("IvTep_TeId", 18);
        let err = fixture.eval(DefaultFn::ParentId, "WATEPQ").unwrap_err();
        assert!(matches!(
            err,
            Error::MissingParentId { parent_field, .. } if parent_field == "IvTek_TeId"
        ));

        fixture.parent_ids.insert("IvTek_TeId", "123456789012345678");
        assert_eq!(
            fixture.eval(DefaultFn::ParentId, "WATEPQ").unwrap(),
            Value::from("123456789012345678")
        );
    }

    #[test]
    fn test_address_names_skip_duplicates_and_street() {
        let fixture = Fixture::new(despatch());
        let name = |rank| {
            fixture
                .eval(
                    DefaultFn::AddressName {
                        party: Party::DeliveryCustomer,
                        rank,
                    },
                    "AUSK",
                )
                .unwrap()
        };
        assert_eq!(name(0), Value::from("Anna Meier"));
        assert_eq!(name(1), Value::from("Hofladen Meier"));
        assert_eq!(name(2), Value::Null);
        assert_eq!(
            fixture
                .eval(
                    DefaultFn::AddressStreet {
                        party: Party::DeliveryCustomer
                    },
                    "AUSK"
                )
                .unwrap(),
            Value::from("Dorfstrasse 4")
        );
        assert_eq!(
            fixture
                .eval(
                    DefaultFn::AddressName {
                        party: Party::DespatchSupplier,
                        rank: 0
                    },
                    "AUSK"
                )
                .unwrap(),
            Value::Null
        );
    }
}
