use crate::config::ConversionConfig;
use crate::detect::DocumentKind;
use crate::dispatch::{DictDocument, TemplateSpec, UblDocument};
use crate::extract::Extractor;
use crate::ubl::flatten_xml;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use wamas_codec::{
    DecodeOptions, EncodeOptions, EncodedLine, SystemIds, Telegram, TelegramEncoder,
    decode_stream, lines_to_bytes, remap_telegram,
};
use wamas_grammar::GrammarRegistry;
use wamas_record::{DEFAULT_TIMEZONE, GenericRecord, Value};
use wamas_template::RenderContext;

/// Entry point for every conversion.
///
/// Holds the immutable grammar registry and the run settings. Cloning is
/// cheap and clones can be used from several threads at once.
#[derive(Debug, Clone)]
pub struct Converter {
    registry: Arc<GrammarRegistry>,
    timezone: Tz,
    systems: SystemIds,
    decode_options: DecodeOptions,
    extra_data: GenericRecord,
    now: Option<DateTime<Utc>>,
    seed: Option<u64>,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter {
    /// Converter over the builtin grammars with default settings.
    pub fn new() -> Self {
        let mut extra_data = GenericRecord::new();
        extra_data.insert("DeliveryCustomerParty", GenericRecord::new());
        extra_data.insert("DespatchSupplierParty", GenericRecord::new());
        Self {
            registry: Arc::new(GrammarRegistry::builtin()),
            timezone: DEFAULT_TIMEZONE,
            systems: SystemIds::default(),
            decode_options: DecodeOptions::default(),
            extra_data,
            now: None,
            seed: None,
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid settings and [`Error::Grammar`]
    /// when a configured grammar file cannot be loaded.
    pub fn from_config(config: &ConversionConfig) -> Result<Self> {
        Ok(Self {
            registry: Arc::new(config.build_registry()?),
            timezone: config.timezone()?,
            systems: config.systems(),
            decode_options: config.decode_options(),
            extra_data: config.extra_data()?,
            now: None,
            seed: None,
        })
    }

    pub fn with_registry(mut self, registry: Arc<GrammarRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Fix the clock used for current-date values.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Make generated ids reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_extra_data(mut self, extra_data: GenericRecord) -> Self {
        self.extra_data = extra_data;
        self
    }

    pub fn registry(&self) -> &GrammarRegistry {
        &self.registry
    }

    /// Decode a telegram with the configured options.
    ///
    /// # Errors
    ///
    /// Returns the decoder's [`Error::Codec`] errors.
    pub fn decode(&self, input: &[u8]) -> Result<Telegram> {
        Ok(decode_stream(input, &self.registry, &self.decode_options)?)
    }

    /// Telegram as records grouped by record type.
    ///
    /// # Errors
    ///
    /// Same as [`Converter::decode`].
    pub fn wamas_to_dict(&self, input: &[u8]) -> Result<GenericRecord> {
        Ok(self.decode(input)?.to_record())
    }

    /// Detect the document carried by a telegram. Field values are not
    /// validated, only the record types matter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`] for unknown record types or bad line lengths.
    pub fn detect_type(&self, input: &[u8]) -> Result<DocumentKind> {
        let options = self.decode_options.clone().with_simplified_grammar(true);
        let telegram = decode_stream(input, &self.registry, &options)?;
        Ok(DocumentKind::of(&telegram))
    }

    /// Decode a telegram fully and summarise it.
    ///
    /// # Errors
    ///
    /// Same as [`Converter::decode`].
    pub fn check(&self, input: &[u8]) -> Result<CheckReport> {
        let telegram = self.decode(input)?;
        Ok(CheckReport {
            kind: DocumentKind::of(&telegram),
            record_types: telegram.observed_types().into_iter().collect(),
            data: telegram.to_record(),
        })
    }

    /// Render one UBL document per transfer of a decoded confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDocument`] for kinds without a template and
    /// [`Error::MissingTelegram`] when the head record type is absent.
    pub fn dict_to_ubl(&self, kind: DocumentKind, telegram: &Telegram) -> Result<Vec<String>> {
        let spec = TemplateSpec::for_kind(kind).ok_or_else(|| Error::unsupported(kind.as_str()))?;
        let template = spec.template()?;
        let transfers = Extractor::new(telegram).extract(spec)?;
        let now = self.now.unwrap_or_else(Utc::now);

        let documents: Vec<String> = transfers
            .iter()
            .map(|transfer| {
                let context = RenderContext::new(transfer.to_record())
                    .with_extra_data(self.extra_data.clone())
                    .with_unit_codes(self.registry.unit_codes().pairs())
                    .with_timezone(self.timezone)
                    .with_now(now);
                template.render(&context)
            })
            .collect();

        info!(
            kind = kind.as_str(),
            template = spec.template_name,
            documents = documents.len(),
            "UBL rendered"
        );
        Ok(documents)
    }

    /// Decode a confirmation telegram and render it to UBL.
    ///
    /// # Errors
    ///
    /// Same as [`Converter::decode`] and [`Converter::dict_to_ubl`].
    pub fn wamas_to_ubl(&self, input: &[u8]) -> Result<Vec<String>> {
        let telegram = self.decode(input)?;
        let kind = DocumentKind::of(&telegram);
        debug!(kind = kind.as_str(), "converting telegram to UBL");
        self.dict_to_ubl(kind, &telegram)
    }

    /// Encode a UBL document into telegram lines.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Xml`] for malformed XML and the encoder's
    /// [`Error::Codec`] errors.
    pub fn ubl_to_records(&self, xml: &str, document: UblDocument) -> Result<Vec<EncodedLine>> {
        let record = flatten_xml(xml)?;
        let lines = self.encoder().encode_records(&record, &document.plan())?;
        info!(document = document.as_str(), lines = lines.len(), "UBL encoded");
        Ok(lines)
    }

    /// Encode a UBL document into Latin-1 telegram bytes.
    ///
    /// # Errors
    ///
    /// Same as [`Converter::ubl_to_records`].
    pub fn ubl_to_wamas(&self, xml: &str, document: UblDocument) -> Result<Vec<u8>> {
        Ok(lines_to_bytes(&self.ubl_to_records(xml, document)?))
    }

    /// Encode an ERP record into telegram lines.
    ///
    /// # Errors
    ///
    /// Returns the encoder's [`Error::Codec`] errors.
    pub fn dict_to_records(
        &self,
        record: &GenericRecord,
        document: DictDocument,
    ) -> Result<Vec<EncodedLine>> {
        let lines = self.encoder().encode_records(record, &document.plan())?;
        info!(document = document.as_str(), lines = lines.len(), "record encoded");
        Ok(lines)
    }

    /// Encode an ERP record into Latin-1 telegram bytes.
    ///
    /// # Errors
    ///
    /// Same as [`Converter::dict_to_records`].
    pub fn dict_to_wamas(&self, record: &GenericRecord, document: DictDocument) -> Result<Vec<u8>> {
        Ok(lines_to_bytes(&self.dict_to_records(record, document)?))
    }

    /// Answer a warehouse telegram with its confirmation telegram.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`] for undecodable input or record types without
    /// a registered conversion.
    pub fn wamas_to_wamas(&self, input: &[u8]) -> Result<Vec<u8>> {
        let telegram = self.decode(input)?;
        let lines = remap_telegram(&mut self.encoder(), &telegram)?;
        Ok(lines_to_bytes(&lines))
    }

    /// Record types the decoder understands
    pub fn supported_telegrams(&self) -> Vec<&str> {
        self.registry.record_types()
    }

    /// Record types [`Converter::wamas_to_wamas`] can answer
    pub fn supported_remap_types(&self) -> Vec<&str> {
        self.registry.conversion_sources().collect()
    }

    fn encoder(&self) -> TelegramEncoder<'_> {
        let mut options = EncodeOptions::default()
            .with_timezone(self.timezone)
            .with_systems(self.systems.clone());
        if let Some(now) = self.now {
            options = options.with_now(now);
        }
        if let Some(seed) = self.seed {
            options = options.with_seed(seed);
        }
        TelegramEncoder::new(&self.registry, options)
    }
}

/// Summary of a decoded telegram
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub kind: DocumentKind,
    /// Record types present, sorted
    pub record_types: Vec<String>,
    /// Records grouped by record type
    pub data: GenericRecord,
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.to_json_pretty().map_err(|_| fmt::Error)?;
        writeln!(f, "- WAMAS Type: {}", self.kind.description())?;
        writeln!(f, "- Telegram Type: {}", self.record_types.join(","))?;
        write!(f, "- Data: {data}")
    }
}

impl CheckReport {
    /// Number of decoded lines
    pub fn line_count(&self) -> usize {
        self.data
            .iter()
            .filter_map(|(_, lines)| lines.as_list())
            .map(<[Value]>::len)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn converter() -> Converter {
        Converter::new()
            .with_seed(42)
            .with_now(Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap())
    }

    fn supplier() -> GenericRecord {
        GenericRecord::from_json_str(r#"{"ref": "S-100", "name": "Alpine Dairy", "city": "Bern"}"#)
            .unwrap()
    }

    #[test]
    fn test_dict_to_wamas_and_back() {
        let converter = converter();
        let wamas = converter.dict_to_wamas(&supplier(), DictDocument::Supplier).unwrap();
        assert_eq!(converter.detect_type(&wamas).unwrap(), DocumentKind::Supplier);

        let dict = converter.wamas_to_dict(&wamas).unwrap();
        assert_eq!(
            dict.get_path("LST.0.Lst_Name"),
            Some(&Value::from("Alpine Dairy"))
        );
        assert_eq!(dict.get_path("LST.0.Telheader_Quelle"), Some(&Value::from("ODOO")));
    }

    #[test]
    fn test_check_report() {
        let converter = converter();
        let wamas = converter.dict_to_wamas(&supplier(), DictDocument::Supplier).unwrap();
        let report = converter.check(&wamas).unwrap();
        assert_eq!(report.kind, DocumentKind::Supplier);
        assert_eq!(report.record_types, ["LST"]);
        assert_eq!(report.line_count(), 1);

        let text = report.to_string();
        assert!(text.starts_with("- WAMAS Type: Supplier\n- Telegram Type: LST\n- Data: {"));
        assert!(text.contains("\"Lst_LiefNr\": \"S-100\""));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let wamas = converter()
            .dict_to_wamas(&supplier(), DictDocument::Supplier)
            .unwrap();
        let again = converter()
            .dict_to_wamas(&supplier(), DictDocument::Supplier)
            .unwrap();
        assert_eq!(wamas, again);
    }

    #[test]
    fn test_dict_to_ubl_rejects_master_data() {
        let err = converter()
            .dict_to_ubl(DocumentKind::Product, &Telegram::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedDocument(kind) if kind == "Product"));
    }

    #[test]
    fn test_supported_types() {
        let converter = Converter::new();
        let telegrams = converter.supported_telegrams();
        for t in ["ART", "KSTAUS", "WATEPQ"] {
            assert!(telegrams.contains(&t), "{t}");
        }
        let remap = converter.supported_remap_types();
        assert!(remap.contains(&"AUSK"));
        assert!(!remap.contains(&"ART"));
    }
}
