//! Grouping of decoded confirmation lines into transfers

use crate::dispatch::{KeyedType, TemplateSpec};
use crate::{Error, Result};
use indexmap::IndexMap;
use quick_xml::escape::escape;
use tracing::debug;
use wamas_codec::Telegram;
use wamas_record::{GenericRecord, Value};

/// One business document: a head line with its lines and shipping units
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transfer {
    pub head: GenericRecord,
    pub lines: Vec<GenericRecord>,
    pub packages: Vec<GenericRecord>,
    package_ids: Vec<String>,
}

impl Transfer {
    fn new(head: GenericRecord) -> Self {
        Self {
            head,
            ..Self::default()
        }
    }

    /// Head fields plus `lines` and `packages`, the shape templates expect
    pub fn to_record(&self) -> GenericRecord {
        let mut record = self.head.clone();
        record.insert("lines", to_list(&self.lines));
        record.insert("packages", to_list(&self.packages));
        record
    }
}

fn to_list(records: &[GenericRecord]) -> Value {
    Value::List(records.iter().cloned().map(Value::Record).collect())
}

/// Builds transfers out of a decoded telegram.
///
/// String values are XML-escaped on the way in, so templates can emit them
/// verbatim.
pub struct Extractor<'t> {
    telegram: &'t Telegram,
    transfers: IndexMap<String, Transfer>,
    packages: IndexMap<String, GenericRecord>,
}

impl<'t> Extractor<'t> {
    pub fn new(telegram: &'t Telegram) -> Self {
        Self {
            telegram,
            transfers: IndexMap::new(),
            packages: IndexMap::new(),
        }
    }

    /// Run the grouping described by `spec` and return the transfers in
    /// order of first appearance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingTelegram`] when the head type is absent.
    pub fn extract(mut self, spec: &TemplateSpec) -> Result<Vec<Transfer>> {
        self.read_heads(spec.head)?;
        if let Some(packages) = spec.packages {
            self.read_packages(packages);
        }
        self.read_lines(spec.lines, spec.package_key);
        debug!(transfers = self.transfers.len(), "transfers extracted");
        Ok(self.transfers.into_values().collect())
    }

    fn read_heads(&mut self, head: KeyedType) -> Result<()> {
        if !self.telegram.contains(head.record_type) {
            return Err(Error::MissingTelegram(head.record_type.to_string()));
        }
        for record in self.telegram.records(head.record_type) {
            let key = key_of(record, head.key);
            if self.transfers.contains_key(&key) {
                debug!(record_type = head.record_type, %key, "redundant head record ignored");
                continue;
            }
            self.transfers.insert(key, Transfer::new(escaped(record)));
        }
        Ok(())
    }

    fn read_packages(&mut self, packages: KeyedType) {
        for record in self.telegram.records(packages.record_type) {
            let key = key_of(record, packages.key);
            if self.packages.contains_key(&key) {
                debug!(record_type = packages.record_type, %key, "redundant package ignored");
                continue;
            }
            self.packages.insert(key, escaped(record));
        }
    }

    fn read_lines(&mut self, lines: KeyedType, package_key: Option<&str>) {
        for record in self.telegram.records(lines.record_type) {
            let key = key_of(record, lines.key);
            let Some(transfer) = self.transfers.get_mut(&key) else {
                debug!(record_type = lines.record_type, %key, "line of unknown transfer ignored");
                continue;
            };
            let mut line = escaped(record);

            if let Some(field) = package_key {
                let package_id = key_of(record, field);
                match self.packages.get(&package_id) {
                    Some(package) => {
                        line.insert("package", package.clone());
                        if !transfer.package_ids.contains(&package_id) {
                            transfer.packages.push(package.clone());
                            transfer.package_ids.push(package_id);
                        }
                    }
                    None => {
                        debug!(
                            record_type = lines.record_type,
                            %package_id,
                            "line with unknown package"
                        );
                    }
                }
            }
            transfer.lines.push(line);
        }
    }
}

fn key_of(record: &GenericRecord, field: &str) -> String {
    record.get(field).map(Value::to_text).unwrap_or_default()
}

/// Copy of a record with every string value XML-escaped.
fn escaped(record: &GenericRecord) -> GenericRecord {
    record
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => Value::String(escape(s.as_str()).into_owned()),
                other => other.clone(),
            };
            (key.to_string(), value)
        })
        .collect()
}
