use crate::defaults::{self, DefaultContext};
use crate::value_codec::encode_value;
use crate::{Result, latin1};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use indexmap::IndexMap;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::borrow::Cow;
use tracing::{debug, trace};
use wamas_grammar::{FieldSpec, Grammar, GrammarRegistry, SourcePath};
use wamas_record::{DEFAULT_TIMEZONE, GenericRecord, Value};

/// Master-data type written once per picking zone
const KSTAUS: &str = "KSTAUS";
const KSTAUS_PICKING_ZONES: [&str; 2] = ["kMEZ", "kPAR"];

/// Identifiers written into `Telheader_Quelle` / `Telheader_Ziel`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemIds {
    pub erp: String,
    pub wamas: String,
}

impl Default for SystemIds {
    fn default() -> Self {
        Self {
            erp: "ODOO".to_string(),
            wamas: "WAMAS".to_string(),
        }
    }
}

/// Runtime inputs of an encoding run
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Reference instant for current-date defaults
    pub now: DateTime<Utc>,
    pub timezone: Tz,
    pub systems: SystemIds,
    /// Seed for the random defaults; `None` draws from the OS
    pub seed: Option<u64>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            now: Utc::now(),
            timezone: DEFAULT_TIMEZONE,
            systems: SystemIds::default(),
            seed: None,
        }
    }
}

impl EncodeOptions {
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_systems(mut self, systems: SystemIds) -> Self {
        self.systems = systems;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Position inside a repeated group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopPosition {
    pub index: usize,
    pub len: usize,
}

/// Per-line encoding context
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    /// 1-based running line number, written into `Telheader_TelSeq`
    pub line_idx: usize,
    pub position: Option<LoopPosition>,
    pub record_type_out: &'a str,
    /// Shift date-time values from UTC into the configured zone
    pub convert_tz: bool,
}

/// Ids written by parent lines, read back by their children.
///
/// Scoped to one encoding run.
#[derive(Debug, Clone, Default)]
pub struct ParentIdRegistry {
    ids: IndexMap<String, String>,
}

impl ParentIdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, id: impl Into<String>) {
        self.ids.insert(field.into(), id.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.ids.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One encoded line, every field at its exact width
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedLine {
    pub record_type: String,
    pub fields: IndexMap<String, String>,
}

impl EncodedLine {
    /// The fixed-width line text
    pub fn to_line(&self) -> String {
        self.fields.values().map(String::as_str).collect()
    }
}

/// Join lines with `\n`, no trailing newline
pub fn lines_to_string(lines: &[EncodedLine]) -> String {
    lines
        .iter()
        .map(EncodedLine::to_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Telegram bytes in Latin-1
pub fn lines_to_bytes(lines: &[EncodedLine]) -> Vec<u8> {
    latin1::encode(&lines_to_string(lines))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PlanStep {
    record_type: String,
    repeat_over: Option<String>,
}

/// Ordered record types to write from one input record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodePlan {
    steps: Vec<PlanStep>,
}

impl EncodePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// One line per record type, in order
    pub fn from_types(types: &[&str]) -> Self {
        types.iter().fold(Self::new(), |plan, t| plan.then(t))
    }

    /// Write one line of `record_type`
    pub fn then(mut self, record_type: &str) -> Self {
        self.steps.push(PlanStep {
            record_type: record_type.to_string(),
            repeat_over: None,
        });
        self
    }

    /// Write one line of `record_type` per element of the list at `path`
    pub fn then_repeated(mut self, record_type: &str, path: &str) -> Self {
        self.steps.push(PlanStep {
            record_type: record_type.to_string(),
            repeat_over: Some(path.to_string()),
        });
        self
    }

    pub fn record_types(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.record_type.as_str())
    }
}

/// Writes telegram lines from records.
///
/// Holds the random source so seeded runs are reproducible.
pub struct TelegramEncoder<'r> {
    registry: &'r GrammarRegistry,
    options: EncodeOptions,
    rng: StdRng,
}

impl<'r> TelegramEncoder<'r> {
    pub fn new(registry: &'r GrammarRegistry, options: EncodeOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            registry,
            options,
            rng,
        }
    }

    pub fn registry(&self) -> &'r GrammarRegistry {
        self.registry
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Encode every field of `grammar` from `input`.
    ///
    /// Parent-key fields of `record_type_out` are recorded in `parent_ids`
    /// once written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ValueFormat`] for values the field kind cannot
    /// hold and [`crate::Error::MissingParentId`] for a child line written
    /// before its parent.
    pub fn encode_fields(
        &mut self,
        input: &GenericRecord,
        grammar: &Grammar,
        ctx: &LineContext<'_>,
        parent_ids: &mut ParentIdRegistry,
    ) -> Result<EncodedLine> {
        let registry = self.registry;
        let timezone = ctx.convert_tz.then_some(self.options.timezone);
        let mut out: IndexMap<String, String> = IndexMap::with_capacity(grammar.fields.len());

        for field in &grammar.fields {
            let value = self.resolve(input, field, ctx, &out, parent_ids)?;
            let value = self.remap_unit_code(&grammar.record_type, field, value);
            let encoded =
                encode_value(&value, field, timezone).map_err(|e| e.at_line(ctx.line_idx))?;
            if registry.is_parent_key(ctx.record_type_out, &field.name) {
                trace!(field = %field.name, id = %encoded, "parent id captured");
                parent_ids.insert(field.name.clone(), encoded.clone());
            }
            out.insert(field.name.clone(), encoded);
        }

        Ok(EncodedLine {
            record_type: ctx.record_type_out.to_string(),
            fields: out,
        })
    }

    /// Encode one line of `record_type` with its registered grammar.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Grammar`] for an unknown record type, otherwise
    /// the errors of [`TelegramEncoder::encode_fields`].
    pub fn encode_line(
        &mut self,
        input: &GenericRecord,
        record_type: &str,
        line_idx: usize,
        parent_ids: &mut ParentIdRegistry,
    ) -> Result<EncodedLine> {
        let grammar = self.registry.require(record_type)?;
        let ctx = LineContext {
            line_idx,
            position: None,
            record_type_out: record_type,
            convert_tz: true,
        };
        self.encode_fields(input, grammar, &ctx, parent_ids)
    }

    /// Encode one input record following `plan`.
    ///
    /// Line numbers run across the whole plan starting at 1. Repeated steps
    /// write one line per element of their list; a missing list writes none.
    ///
    /// # Errors
    ///
    /// Same as [`TelegramEncoder::encode_line`].
    pub fn encode_records(
        &mut self,
        input: &GenericRecord,
        plan: &EncodePlan,
    ) -> Result<Vec<EncodedLine>> {
        let registry = self.registry;
        let mut parent_ids = ParentIdRegistry::new();
        let mut lines = Vec::new();
        let mut line_idx = 0;

        for step in &plan.steps {
            let grammar = registry.require(&step.record_type)?;
            let group_len = match &step.repeat_over {
                None => 1,
                Some(path) => match input.get_path(path) {
                    Some(Value::List(items)) => items.len(),
                    Some(_) => 1,
                    None => {
                        debug!(record_type = %step.record_type, path, "nothing to repeat over");
                        0
                    }
                },
            };
            let variants = line_variants(input, &step.record_type);

            for index in 0..group_len {
                for variant in &variants {
                    line_idx += 1;
                    let ctx = LineContext {
                        line_idx,
                        position: step.repeat_over.as_ref().map(|_| LoopPosition {
                            index,
                            len: group_len,
                        }),
                        record_type_out: &step.record_type,
                        convert_tz: true,
                    };
                    lines.push(self.encode_fields(variant, grammar, &ctx, &mut parent_ids)?);
                }
            }
        }

        debug!(lines = lines.len(), "records encoded");
        Ok(lines)
    }

    /// Encode a record into telegram bytes, one line per listed type.
    ///
    /// # Errors
    ///
    /// Same as [`TelegramEncoder::encode_records`].
    pub fn encode_telegram(&mut self, input: &GenericRecord, types: &[&str]) -> Result<Vec<u8>> {
        let lines = self.encode_records(input, &EncodePlan::from_types(types))?;
        Ok(lines_to_bytes(&lines))
    }

    fn resolve(
        &mut self,
        input: &GenericRecord,
        field: &FieldSpec,
        ctx: &LineContext<'_>,
        out: &IndexMap<String, String>,
        parent_ids: &ParentIdRegistry,
    ) -> Result<Value> {
        // Only missing or empty values fall through; zero and false are data.
        if let Some(source) = &field.source {
            let (index, len) = ctx.position.map_or((0, 1), |p| (p.index, p.len));
            let value = lookup_source(input, &source.resolve_placeholder(index, len));
            if !value.is_blank() {
                return Ok(value);
            }
        }
        if let Some(value) = field.dict_key.as_deref().and_then(|key| input.get(key)) {
            if !value.is_blank() {
                return Ok(value.clone());
            }
        }
        if let Some(default) = field.default.as_deref().filter(|d| !d.is_empty()) {
            return Ok(Value::String(default.to_string()));
        }
        match &field.default_fn {
            Some(default_fn) => {
                let ctx = DefaultContext {
                    input,
                    output: out,
                    parent_ids,
                    registry: self.registry,
                    options: &self.options,
                    line: ctx,
                    field,
                };
                defaults::evaluate(default_fn, &ctx, &mut self.rng)
            }
            None => Ok(Value::Null),
        }
    }

    fn remap_unit_code(&self, record_type: &str, field: &FieldSpec, value: Value) -> Value {
        if !self.registry.is_unit_code_field(record_type, &field.name) {
            return value;
        }
        match value.as_str().and_then(|code| self.registry.unit_codes().to_wamas(code)) {
            Some(wamas) => Value::String(wamas.to_string()),
            None => value,
        }
    }
}

/// Inputs to encode for one plan step; KSTAUS repeats per picking zone
fn line_variants<'a>(input: &'a GenericRecord, record_type: &str) -> Vec<Cow<'a, GenericRecord>> {
    if record_type != KSTAUS {
        return vec![Cow::Borrowed(input)];
    }
    KSTAUS_PICKING_ZONES
        .iter()
        .map(|zone| {
            let mut record = input.clone();
            record.insert("picking_zone", *zone);
            Cow::Owned(record)
        })
        .collect()
}

/// Read a source path; blank when nothing is found.
fn lookup_source(input: &GenericRecord, source: &SourcePath) -> Value {
    match source {
        SourcePath::Direct(path) => input.get_path(path).cloned().unwrap_or_default(),
        SourcePath::Alternatives(paths) => {
            let found: Vec<String> = paths
                .iter()
                .filter_map(|path| input.get_path(path))
                .filter(|value| !value.is_blank())
                .map(Value::to_text)
                .collect();
            if found.is_empty() {
                Value::Null
            } else {
                Value::String(found.join(" "))
            }
        }
        SourcePath::Conditional(branches) => branches
            .iter()
            .find(|(condition, _)| input.get_path(condition).is_some_and(|v| !v.is_blank()))
            .and_then(|(_, target)| input.get_path(target).cloned())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use chrono::TimeZone;
    use wamas_grammar::header::{Direction, with_header};
    use wamas_grammar::{DefaultFn, RegistryBuilder};

    fn options() -> EncodeOptions {
        EncodeOptions::default()
            .with_now(Utc.with_ymd_and_hms(2023, 5, 1, 6, 57, 23).unwrap())
            .with_seed(42)
    }

    fn registry() -> GrammarRegistry {
        RegistryBuilder::new()
            .with_grammar(with_header(
                "HEAD",
                "HEAD00050",
                Direction::Outbound,
                vec![
                    FieldSpec::string("Id", 6).with_default_fn(DefaultFn::RandomDigits),
                    FieldSpec::string("Note", 12).with_alternatives(&["a.note", "a.extra"]),
                    FieldSpec::string("Unit", 4).with_path("unit"),
                ],
            ))
            .with_grammar(with_header(
                "ITEM",
                "ITEM00050",
                Direction::Outbound,
                vec![
                    FieldSpec::string("ParentId", 6).with_default_fn(DefaultFn::ParentId),
                    FieldSpec::integer("Pos", 3)
                        .with_path("items.%s.pos")
                        .with_default_fn(DefaultFn::LoopIndex),
                    FieldSpec::string("Lot", 5).with_conditional(&[
                        ("items.%s.lot", "items.%s.lot.number"),
                        ("items.%s.serial", "items.%s.serial"),
                    ]),
                ],
            ))
            .with_parent_key("HEAD", "Id")
            .with_child_key("ITEM", "ParentId", "Id")
            .with_unit_code_field("HEAD", "Unit")
            .with_unit_codes(wamas_grammar::UnitCodeMap::builtin())
            .build()
    }

    fn input() -> GenericRecord {
        GenericRecord::from_json_str(
            r#"{
                "a": {"note": "fragile", "extra": "top"},
                "unit": "XBQ",
                "items": [
                    {"pos": 10, "lot": {"number": "L1"}},
                    {"serial": "S2"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_plan_with_parent_and_repetition() {
        let registry = registry();
        let mut encoder = TelegramEncoder::new(&registry, options());
        let plan = EncodePlan::new().then("HEAD").then_repeated("ITEM", "items");
        let lines = encoder.encode_records(&input(), &plan).unwrap();

        assert_eq!(lines.len(), 3);
        let head = &lines[0];
        assert_eq!(head.fields["Telheader_Quelle"], "ODOO      ");
        assert_eq!(head.fields["Telheader_TelSeq"], "000001");
        assert_eq!(head.fields["Telheader_AnlZeit"], "20230501085723");
        assert_eq!(head.fields["Note"], "fragile top ");
        assert_eq!(head.fields["Unit"], "BOT ");

        let id = &head.fields["Id"];
        assert_eq!(id.len(), 6);
        assert!(id.chars().all(|c| c.is_ascii_digit()));
        assert_ne!(id.as_bytes()[0], b'0');

        assert_eq!(lines[1].fields["ParentId"], *id);
        assert_eq!(lines[1].fields["Pos"], "010");
        assert_eq!(lines[1].fields["Lot"], "L1   ");
        assert_eq!(lines[2].fields["Pos"], "001");
        assert_eq!(lines[2].fields["Lot"], "S2   ");
        assert_eq!(lines[2].fields["Telheader_TelSeq"], "000003");
    }

    #[test]
    fn test_single_element_group_drops_placeholder() {
        let registry = registry();
        let mut encoder = TelegramEncoder::new(&registry, options());
        let input = GenericRecord::from_json_str(
            r#"{"items": {"pos": 7, "serial": "S9"}}"#,
        )
        .unwrap();
        let plan = EncodePlan::new().then("HEAD").then_repeated("ITEM", "items");
        let lines = encoder.encode_records(&input, &plan).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].fields["Pos"], "007");
        assert_eq!(lines[1].fields["Lot"], "S9   ");
    }

    #[test]
    fn test_child_without_parent_fails() {
        let registry = registry();
        let mut encoder = TelegramEncoder::new(&registry, options());
        let err = encoder
            .encode_records(&input(), &EncodePlan::new().then_repeated("ITEM", "items"))
            .unwrap_err();
        assert!(matches!(err, Error::MissingParentId { field, .. } if field == "ParentId"));
    }

    #[test]
    fn test_missing_list_writes_nothing() {
        let registry = registry();
        let mut encoder = TelegramEncoder::new(&registry, options());
        let plan = EncodePlan::new().then("HEAD").then_repeated("ITEM", "nothing");
        let lines = encoder.encode_records(&input(), &plan).unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_zero_and_false_are_kept_over_fallbacks() {
        let registry = RegistryBuilder::new()
            .with_grammar(with_header(
                "QTY",
                "QTY000050",
                Direction::Outbound,
                vec![
                    FieldSpec::integer("Qty", 3)
                        .with_path("line.qty")
                        .with_key("fallback_qty")
                        .with_default("9"),
                    FieldSpec::boolean("Flag", 1).with_path("line.flag").with_default("J"),
                    FieldSpec::integer("Missing", 3)
                        .with_path("line.missing")
                        .with_key("fallback_qty"),
                ],
            ))
            .build();
        let input = GenericRecord::from_json_str(
            r#"{"line": {"qty": 0, "flag": false, "missing": ""}, "fallback_qty": 5}"#,
        )
        .unwrap();
        let lines = TelegramEncoder::new(&registry, options())
            .encode_records(&input, &EncodePlan::from_types(&["QTY"]))
            .unwrap();
        assert_eq!(lines[0].fields["Qty"], "000");
        assert_eq!(lines[0].fields["Flag"], "N");
        assert_eq!(lines[0].fields["Missing"], "005");
    }

    #[test]
    fn test_same_seed_same_output() {
        let registry = registry();
        let plan = EncodePlan::from_types(&["HEAD"]);
        let first = TelegramEncoder::new(&registry, options())
            .encode_records(&input(), &plan)
            .unwrap();
        let second = TelegramEncoder::new(&registry, options())
            .encode_records(&input(), &plan)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_type_is_grammar_error() {
        let registry = registry();
        let mut encoder = TelegramEncoder::new(&registry, options());
        let err = encoder
            .encode_telegram(&input(), &["NOPE"])
            .unwrap_err();
        assert!(matches!(err, Error::Grammar(_)));
    }

    #[test]
    fn test_lines_join_without_trailing_newline() {
        let registry = registry();
        let mut encoder = TelegramEncoder::new(&registry, options());
        let lines = encoder
            .encode_records(&input(), &EncodePlan::from_types(&["HEAD", "HEAD"]))
            .unwrap();
        let text = lines_to_string(&lines);
        assert_eq!(text.lines().count(), 2);
        assert!(!text.ends_with('\n'));
        assert!(text.lines().all(|l| l.chars().count() == 49 + 22));
    }
}
