//! Grammar files in YAML

use crate::header::{Direction, header_fields};
use crate::model::{FieldSpec, Grammar, ValueKind};
use crate::registry::RegistryBuilder;
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Serializable registry extension
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    #[serde(default)]
    grammars: Vec<GrammarFile>,
    #[serde(default)]
    output_grammars: Vec<GrammarFile>,
    #[serde(default)]
    conversions: IndexMap<String, Vec<String>>,
    #[serde(default)]
    parent_keys: IndexMap<String, Vec<String>>,
    #[serde(default)]
    child_keys: IndexMap<String, IndexMap<String, String>>,
    #[serde(default)]
    unit_code_fields: IndexMap<String, Vec<String>>,
    #[serde(default)]
    unit_codes: IndexMap<String, String>,
    #[serde(default)]
    off_by_one: Vec<String>,
    #[serde(default)]
    non_ascii_repair: IndexMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct GrammarFile {
    record_type: String,
    #[serde(default)]
    header: Option<HeaderFile>,
    fields: Vec<FieldSpec>,
}

/// Prepend the standard header instead of listing its fields
#[derive(Debug, Deserialize)]
struct HeaderFile {
    satzart: String,
    direction: Direction,
}

impl GrammarFile {
    fn into_grammar(self) -> Result<Grammar> {
        for field in &self.fields {
            validate_field(&self.record_type, field)?;
        }
        let mut fields = match self.header {
            Some(header) => header_fields(&header.satzart, header.direction),
            None => Vec::new(),
        };
        fields.extend(self.fields);
        Ok(Grammar::new(self.record_type, fields))
    }
}

fn validate_field(record_type: &str, field: &FieldSpec) -> Result<()> {
    if field.width == 0 {
        return Err(Error::InvalidFormat(format!(
            "{record_type}.{}: width must be positive",
            field.name
        )));
    }
    if field.kind == ValueKind::Float && field.decimal_places >= field.width {
        return Err(Error::InvalidFormat(format!(
            "{record_type}.{}: {} decimal places do not fit in width {}",
            field.name, field.decimal_places, field.width
        )));
    }
    Ok(())
}

impl RegistryBuilder {
    /// Merge grammars and tables from a YAML document.
    ///
    /// Grammars with a known record type replace the existing ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed YAML and [`Error::InvalidFormat`]
    /// for field definitions that cannot describe a fixed-width layout.
    pub fn load_yaml_str(mut self, input: &str) -> Result<Self> {
        let file: RegistryFile =
            serde_yaml::from_str(input).map_err(|e| Error::Parse(e.to_string()))?;

        for grammar in file.grammars {
            self = self.with_grammar(grammar.into_grammar()?);
        }
        for grammar in file.output_grammars {
            self = self.with_output_grammar(grammar.into_grammar()?);
        }
        for (from, to) in &file.conversions {
            let targets: Vec<&str> = to.iter().map(String::as_str).collect();
            self = self.with_conversion(from, &targets);
        }
        for (record_type, fields) in &file.parent_keys {
            for field in fields {
                self = self.with_parent_key(record_type, field);
            }
        }
        for (record_type, fields) in &file.child_keys {
            for (field, parent) in fields {
                self = self.with_child_key(record_type, field, parent);
            }
        }
        for (record_type, fields) in &file.unit_code_fields {
            for field in fields {
                self = self.with_unit_code_field(record_type, field);
            }
        }
        if !file.unit_codes.is_empty() {
            let unit_codes = file
                .unit_codes
                .into_iter()
                .fold(self.current_unit_codes(), |map, (wamas, ubl)| {
                    map.with_pair(wamas, ubl)
                });
            self = self.with_unit_codes(unit_codes);
        }
        for record_type in &file.off_by_one {
            self = self.with_off_by_one(record_type);
        }
        for (record_type, field) in &file.non_ascii_repair {
            self = self.with_non_ascii_repair(record_type, field);
        }

        debug!("grammar document merged");
        Ok(self)
    }

    /// Merge grammars and tables from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise the errors of
    /// [`RegistryBuilder::load_yaml_str`].
    pub fn load_yaml_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading grammar file");
        let content = std::fs::read_to_string(path)?;
        self.load_yaml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HEADER_WIDTH;

    const SAMPLE: &str = r#"
grammars:
  - record_type: TOUR
    header: { satzart: TOUR00050, direction: outbound }
    fields:
      - { name: Tour_Nr, width: 10, kind: string, dict_key: ref }
      - { name: Tour_Gew, width: 12, kind: float, decimal_places: 3 }
      - name: Tour_Datum
        width: 8
        kind: date
        default_fn: { fn: current_date }
conversions:
  TOUR: [TOURQ]
off_by_one: [TOUR]
unit_codes:
  KISTE: XCR
"#;

    #[test]
    fn test_load_grammar_with_header() {
        let registry = RegistryBuilder::new().load_yaml_str(SAMPLE).unwrap().build();
        let grammar = registry.grammar("TOUR").unwrap();
        assert_eq!(grammar.width(), HEADER_WIDTH + 30);
        assert_eq!(grammar.field("Tour_Gew").unwrap().decimal_places, 3);
        assert_eq!(
            registry.conversion_targets("TOUR"),
            Some(["TOURQ".to_string()].as_slice())
        );
        assert!(registry.tolerance().allows_off_by_one("TOUR"));
        assert_eq!(registry.unit_codes().to_ubl("KISTE"), Some("XCR"));
    }

    #[test]
    fn test_merged_unit_codes_keep_builtin_pairs() {
        let registry = RegistryBuilder::builtin().load_yaml_str(SAMPLE).unwrap().build();
        assert_eq!(registry.unit_codes().to_ubl("KISTE"), Some("XCR"));
        assert_eq!(registry.unit_codes().to_ubl("BOT"), Some("XBQ"));
    }

    #[test]
    fn test_rejects_zero_width() {
        let yaml = "grammars:\n  - record_type: BAD\n    fields:\n      \
                    - { name: x, width: 0, kind: string }\n";
        let err = RegistryBuilder::new().load_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(msg) if msg.contains("BAD.x")));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = RegistryBuilder::new().load_yaml_str("grammer: []").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extra.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let registry = RegistryBuilder::new().load_yaml_file(&path).unwrap().build();
        assert!(registry.contains("TOUR"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RegistryBuilder::new()
            .load_yaml_file("/nonexistent/grammar.yaml")
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
