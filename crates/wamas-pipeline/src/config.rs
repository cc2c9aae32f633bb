//! Converter configuration.
//!
//! ```yaml
//! timezone: Europe/Zurich
//! erp_system: ODOO
//! wamas_system: WAMAS
//! ignored_types: [AUSPQ, TOURQ, TAUSPQ]
//! grammar_files:
//!   - grammars/site.yaml
//! extra_data:
//!   DespatchSupplierParty:
//!     name: Alpine Dairy
//! ```

use crate::{Error, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use wamas_codec::{DEFAULT_IGNORED_TYPES, DecodeOptions, SystemIds};
use wamas_grammar::{GrammarRegistry, RegistryBuilder};
use wamas_record::{GenericRecord, Value};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionConfig {
    /// Local timezone of the warehouse
    pub timezone: String,
    pub erp_system: String,
    pub wamas_system: String,
    /// Record types skipped while decoding
    pub ignored_types: Vec<String>,
    /// Additional grammar files layered over the builtin grammars
    pub grammar_files: Vec<PathBuf>,
    /// Parties and other data made available to templates as `extra_data`
    pub extra_data: serde_json::Value,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Zurich".to_string(),
            erp_system: "ODOO".to_string(),
            wamas_system: "WAMAS".to_string(),
            ignored_types: DEFAULT_IGNORED_TYPES.iter().map(|t| t.to_string()).collect(),
            grammar_files: Vec::new(),
            extra_data: serde_json::json!({
                "DeliveryCustomerParty": {},
                "DespatchSupplierParty": {},
            }),
        }
    }
}

impl ConversionConfig {
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed YAML or unknown keys.
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        serde_yaml::from_str(input).map_err(|e| Error::config(e.to_string()))
    }

    /// Load a configuration file. Relative grammar paths are resolved
    /// against the directory of the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and [`Error::Config`]
    /// if it does not parse.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| Error::io("read config", path.display().to_string(), e.to_string()))?;
        let mut config = Self::from_yaml_str(&input)?;
        if let Some(dir) = path.parent() {
            for file in &mut config.grammar_files {
                if file.is_relative() {
                    *file = dir.join(&*file);
                }
            }
        }
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unknown timezone name.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| Error::config(format!("timezone '{}': {e}", self.timezone)))
    }

    /// Builtin grammars extended with the configured grammar files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Grammar`] if a grammar file cannot be loaded.
    pub fn build_registry(&self) -> Result<GrammarRegistry> {
        let mut builder = RegistryBuilder::builtin();
        for file in &self.grammar_files {
            builder = builder.load_yaml_file(file)?;
        }
        Ok(builder.build())
    }

    /// # Errors
    ///
    /// Returns [`Error::Config`] when `extra_data` is not a mapping.
    pub fn extra_data(&self) -> Result<GenericRecord> {
        match Value::from_json(self.extra_data.clone()) {
            Value::Record(record) => Ok(record),
            Value::Null => Ok(GenericRecord::new()),
            other => Err(Error::config(format!(
                "extra_data must be a mapping, found {}",
                other.type_name()
            ))),
        }
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::default().with_ignored_types(self.ignored_types.iter().cloned())
    }

    pub fn systems(&self) -> SystemIds {
        SystemIds {
            erp: self.erp_system.clone(),
            wamas: self.wamas_system.clone(),
        }
    }
}
