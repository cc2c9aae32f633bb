//! Document kinds mapped to their templates and encode plans

use crate::detect::DocumentKind;
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use wamas_codec::EncodePlan;
use wamas_grammar::DESPATCH_LINE;
use wamas_template::Template;

const RECEPTION_XML: &str = include_str!("../templates/reception.xml");
const RETURN_XML: &str = include_str!("../templates/return.xml");
const PICKING_XML: &str = include_str!("../templates/picking.xml");

static RECEPTION: LazyLock<wamas_template::Result<Template>> =
    LazyLock::new(|| Template::parse(RECEPTION_XML));
static RETURN: LazyLock<wamas_template::Result<Template>> =
    LazyLock::new(|| Template::parse(RETURN_XML));
static PICKING: LazyLock<wamas_template::Result<Template>> =
    LazyLock::new(|| Template::parse(PICKING_XML));

/// A record type and the field identifying its records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyedType {
    pub record_type: &'static str,
    pub key: &'static str,
}

const fn keyed(record_type: &'static str, key: &'static str) -> KeyedType {
    KeyedType { record_type, key }
}

/// How a confirmation telegram is grouped and rendered to UBL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateSpec {
    pub kind: DocumentKind,
    pub template_name: &'static str,
    /// One transfer per distinct head key
    pub head: KeyedType,
    /// Shipping units referenced by lines, picking only
    pub packages: Option<KeyedType>,
    /// Lines, keyed by the head key they belong to
    pub lines: KeyedType,
    /// Field of a line naming its package
    pub package_key: Option<&'static str>,
}

const TEMPLATE_SPECS: [TemplateSpec; 3] = [
    TemplateSpec {
        kind: DocumentKind::ReceptionResponse,
        template_name: "reception.xml",
        head: keyed("WEAKQ", "IvWevk_WevId_WevNr"),
        packages: None,
        lines: keyed("WEAPQ", "IvWevp_WevId_WevNr"),
        package_key: None,
    },
    TemplateSpec {
        kind: DocumentKind::ReturnResponse,
        template_name: "return.xml",
        head: keyed("KRETKQ", "IvKretk_KretId_KretNr"),
        packages: None,
        lines: keyed("KRETPQ", "IvKretp_KretId_KretNr"),
        package_key: None,
    },
    TemplateSpec {
        kind: DocumentKind::PickingResponse,
        template_name: "picking.xml",
        head: keyed("AUSKQ", "IvAusk_AusId_AusNr"),
        packages: Some(keyed("WATEKQ", "IvTek_TeId")),
        lines: keyed("WATEPQ", "IvAusp_UrAusId_AusNr"),
        package_key: Some("IvTep_TeId"),
    },
];

impl TemplateSpec {
    /// Template entry for a document kind, if it renders to UBL.
    pub fn for_kind(kind: DocumentKind) -> Option<&'static TemplateSpec> {
        TEMPLATE_SPECS.iter().find(|spec| spec.kind == kind)
    }

    pub fn all() -> &'static [TemplateSpec] {
        &TEMPLATE_SPECS
    }

    /// The compiled template, parsed once and shared.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] if the bundled template does not parse.
    pub fn template(&self) -> Result<&'static Template> {
        let compiled = match self.kind {
            DocumentKind::ReceptionResponse => &*RECEPTION,
            DocumentKind::ReturnResponse => &*RETURN,
            DocumentKind::PickingResponse => &*PICKING,
            other => return Err(Error::unsupported(other.as_str())),
        };
        compiled.as_ref().map_err(|e| Error::Template(e.clone()))
    }
}

/// UBL documents that can be sent to the warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UblDocument {
    Reception,
    Picking,
    Return,
}

impl UblDocument {
    pub const ALL: [UblDocument; 3] = [Self::Reception, Self::Picking, Self::Return];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reception => "Reception",
            Self::Picking => "Picking",
            Self::Return => "Return",
        }
    }

    /// Head type once, then one line per despatch line
    pub fn plan(self) -> EncodePlan {
        let (head, line) = match self {
            Self::Reception => ("WEAK", "WEAP"),
            Self::Picking => ("AUSK", "AUSP"),
            Self::Return => ("KRETK", "KRETP"),
        };
        EncodePlan::new()
            .then(head)
            .then_repeated(line, DESPATCH_LINE)
    }
}

/// ERP master-data documents that can be sent to the warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DictDocument {
    Supplier,
    Customer,
    Product,
    Packaging,
    Barcode,
    CustomerDeliveryPreferences,
}

impl DictDocument {
    pub const ALL: [DictDocument; 6] = [
        Self::Supplier,
        Self::Customer,
        Self::Product,
        Self::Packaging,
        Self::Barcode,
        Self::CustomerDeliveryPreferences,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Supplier => "Supplier",
            Self::Customer => "Customer",
            Self::Product => "Product",
            Self::Packaging => "Packaging",
            Self::Barcode => "Barcode",
            Self::CustomerDeliveryPreferences => "CustomerDeliveryPreferences",
        }
    }

    pub fn record_type(self) -> &'static str {
        match self {
            Self::Supplier => "LST",
            Self::Customer => "KST",
            Self::Product => "ART",
            Self::Packaging => "ARTE",
            Self::Barcode => "ARTEAN",
            Self::CustomerDeliveryPreferences => "KSTAUS",
        }
    }

    pub fn plan(self) -> EncodePlan {
        EncodePlan::from_types(&[self.record_type()])
    }
}

macro_rules! impl_named {
    ($ty:ty, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::ALL
                    .into_iter()
                    .find(|doc| doc.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| Error::unsupported(format!("{} type '{s}'", $what)))
            }
        }
    };
}

impl_named!(UblDocument, "UBL document");
impl_named!(DictDocument, "record document");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_lookup() {
        let spec = TemplateSpec::for_kind(DocumentKind::PickingResponse).unwrap();
        assert_eq!(spec.template_name, "picking.xml");
        assert_eq!(spec.packages.unwrap().key, "IvTek_TeId");
        assert!(TemplateSpec::for_kind(DocumentKind::Picking).is_none());
        assert!(TemplateSpec::for_kind(DocumentKind::Undefined).is_none());
    }

    #[test]
    fn test_bundled_templates_parse() {
        for spec in TemplateSpec::all() {
            assert!(spec.template().is_ok(), "{}", spec.template_name);
        }
    }

    #[test]
    fn test_plans() {
        let plan = UblDocument::Picking.plan();
        let types: Vec<&str> = plan.record_types().collect();
        assert_eq!(types, ["AUSK", "AUSP"]);
        let plan = DictDocument::CustomerDeliveryPreferences.plan();
        let types: Vec<&str> = plan.record_types().collect();
        assert_eq!(types, ["KSTAUS"]);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("return".parse::<UblDocument>().unwrap(), UblDocument::Return);
        assert_eq!("Barcode".parse::<DictDocument>().unwrap(), DictDocument::Barcode);
        let err = "Invoice".parse::<UblDocument>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported document: UBL document type 'Invoice'");
    }
}
