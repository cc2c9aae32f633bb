//! Immutable registry of record-type grammars and conversion tables

use crate::builtin;
use crate::model::Grammar;
use crate::unit_code::UnitCodeMap;
use crate::{Error, Result};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Length-mismatch tolerances, keyed by record type
#[derive(Debug, Clone, Default)]
pub struct DecodeTolerance {
    off_by_one: HashSet<String>,
    non_ascii_fields: HashMap<String, String>,
}

impl DecodeTolerance {
    /// Whether a line of this type may be one character short or long
    pub fn allows_off_by_one(&self, record_type: &str) -> bool {
        self.off_by_one.contains(record_type)
    }

    /// Field whose mis-encoded text may inflate lines of this type
    pub fn non_ascii_field(&self, record_type: &str) -> Option<&str> {
        self.non_ascii_fields.get(record_type).map(String::as_str)
    }
}

/// Every table the codec needs, built once and shared read-only
#[derive(Debug, Clone, Default)]
pub struct GrammarRegistry {
    grammars: HashMap<String, Grammar>,
    output_grammars: HashMap<String, Grammar>,
    conversions: IndexMap<String, Vec<String>>,
    parent_keys: HashMap<String, Vec<String>>,
    child_keys: HashMap<String, HashMap<String, String>>,
    unit_code_fields: HashMap<String, Vec<String>>,
    unit_codes: UnitCodeMap,
    tolerance: DecodeTolerance,
}

impl GrammarRegistry {
    /// Registry holding the builtin grammars and tables
    pub fn builtin() -> Self {
        RegistryBuilder::builtin().build()
    }

    /// Start from an empty registry
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Grammar for reading and writing a record type
    pub fn grammar(&self, record_type: &str) -> Option<&Grammar> {
        self.grammars.get(record_type)
    }

    /// Like [`GrammarRegistry::grammar`], failing with [`Error::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the record type has no grammar.
    pub fn require(&self, record_type: &str) -> Result<&Grammar> {
        self.grammar(record_type)
            .ok_or_else(|| Error::NotFound(record_type.to_string()))
    }

    /// Grammar used when a record type is produced from another telegram.
    ///
    /// Falls back to the regular grammar when no dedicated one is registered.
    pub fn output_grammar(&self, record_type: &str) -> Option<&Grammar> {
        self.output_grammars
            .get(record_type)
            .or_else(|| self.grammars.get(record_type))
    }

    /// Check if a record type is known
    pub fn contains(&self, record_type: &str) -> bool {
        self.grammars.contains_key(record_type)
    }

    /// Known record types, sorted
    pub fn record_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.grammars.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Target types produced from an input type by WAMAS→WAMAS conversion
    pub fn conversion_targets(&self, record_type: &str) -> Option<&[String]> {
        self.conversions.get(record_type).map(Vec::as_slice)
    }

    /// Input types accepted by WAMAS→WAMAS conversion, in table order
    pub fn conversion_sources(&self) -> impl Iterator<Item = &str> {
        self.conversions.keys().map(String::as_str)
    }

    /// Whether an encoded field of `record_type` is captured as a parent id
    pub fn is_parent_key(&self, record_type: &str, field: &str) -> bool {
        self.parent_keys
            .get(record_type)
            .is_some_and(|fields| fields.iter().any(|f| f == field))
    }

    /// Parent key a child field of `record_type` copies its value from
    pub fn parent_key_for(&self, record_type: &str, field: &str) -> Option<&str> {
        self.child_keys
            .get(record_type)
            .and_then(|fields| fields.get(field))
            .map(String::as_str)
    }

    /// Whether a field of `record_type` carries a unit code
    pub fn is_unit_code_field(&self, record_type: &str, field: &str) -> bool {
        self.unit_code_fields
            .get(record_type)
            .is_some_and(|fields| fields.iter().any(|f| f == field))
    }

    pub fn unit_codes(&self) -> &UnitCodeMap {
        &self.unit_codes
    }

    pub fn tolerance(&self) -> &DecodeTolerance {
        &self.tolerance
    }
}

/// Builder assembling a [`GrammarRegistry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: GrammarRegistry,
}

impl RegistryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded with the builtin grammars and tables
    pub fn builtin() -> Self {
        builtin::install(Self::new())
    }

    /// Register or replace a record type grammar
    pub fn with_grammar(mut self, grammar: Grammar) -> Self {
        debug!(
            record_type = %grammar.record_type,
            width = grammar.width(),
            "registering grammar"
        );
        self.registry
            .grammars
            .insert(grammar.record_type.clone(), grammar);
        self
    }

    /// Register or replace a WAMAS→WAMAS output grammar
    pub fn with_output_grammar(mut self, grammar: Grammar) -> Self {
        self.registry
            .output_grammars
            .insert(grammar.record_type.clone(), grammar);
        self
    }

    /// Map an input type to the types generated from it
    pub fn with_conversion(mut self, from: &str, to: &[&str]) -> Self {
        self.registry
            .conversions
            .insert(from.to_string(), to.iter().map(|t| (*t).to_string()).collect());
        self
    }

    /// Capture `field` of `record_type` as a parent id once encoded
    pub fn with_parent_key(mut self, record_type: &str, field: &str) -> Self {
        self.registry
            .parent_keys
            .entry(record_type.to_string())
            .or_default()
            .push(field.to_string());
        self
    }

    /// Fill `field` of `record_type` from the captured `parent_field`
    pub fn with_child_key(mut self, record_type: &str, field: &str, parent_field: &str) -> Self {
        self.registry
            .child_keys
            .entry(record_type.to_string())
            .or_default()
            .insert(field.to_string(), parent_field.to_string());
        self
    }

    /// Remap `field` of `record_type` from UBL to WAMAS unit codes
    pub fn with_unit_code_field(mut self, record_type: &str, field: &str) -> Self {
        self.registry
            .unit_code_fields
            .entry(record_type.to_string())
            .or_default()
            .push(field.to_string());
        self
    }

    pub(crate) fn current_unit_codes(&self) -> UnitCodeMap {
        self.registry.unit_codes.clone()
    }

    pub fn with_unit_codes(mut self, unit_codes: UnitCodeMap) -> Self {
        self.registry.unit_codes = unit_codes;
        self
    }

    /// Accept lines of `record_type` that are one character off
    pub fn with_off_by_one(mut self, record_type: &str) -> Self {
        self.registry
            .tolerance
            .off_by_one
            .insert(record_type.to_string());
        self
    }

    /// Repair non-ASCII inflation of `field` in lines of `record_type`
    pub fn with_non_ascii_repair(mut self, record_type: &str, field: &str) -> Self {
        self.registry
            .tolerance
            .non_ascii_fields
            .insert(record_type.to_string(), field.to_string());
        self
    }

    /// Finish building
    pub fn build(self) -> GrammarRegistry {
        debug!(
            grammars = self.registry.grammars.len(),
            output_grammars = self.registry.output_grammars.len(),
            "grammar registry built"
        );
        self.registry
    }
}
