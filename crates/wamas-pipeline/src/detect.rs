//! Business document detection from the set of record types in a telegram

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;
use wamas_codec::Telegram;

/// Logical document carried by a telegram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DocumentKind {
    Reception,
    ReceptionResponse,
    Picking,
    PickingResponse,
    Return,
    ReturnResponse,
    CustomerDeliveryPreference,
    Supplier,
    Product,
    ProductPackaging,
    ProductEan,
    ProductAndPackaging,
    ProductAndEan,
    PackagingAndEan,
    ProductPackagingAndEan,
    Customer,
    /// No exact match for the observed record types
    Undefined,
}

/// Sorted record-type sets and the document they make up
const DETECTION_TABLE: &[(&[&str], DocumentKind)] = &[
    (&["WEAK", "WEAP"], DocumentKind::Reception),
    (&["WEAKQ", "WEAPQ"], DocumentKind::ReceptionResponse),
    (&["AUSK", "AUSP"], DocumentKind::Picking),
    (&["AUSKQ"], DocumentKind::PickingResponse),
    (&["AUSKQ", "WATEKQ", "WATEPQ"], DocumentKind::PickingResponse),
    (&["KRETK", "KRETP"], DocumentKind::Return),
    (&["KRETKQ", "KRETPQ"], DocumentKind::ReturnResponse),
    (&["KSTAUS"], DocumentKind::CustomerDeliveryPreference),
    (&["LST"], DocumentKind::Supplier),
    (&["ART"], DocumentKind::Product),
    (&["ARTE"], DocumentKind::ProductPackaging),
    (&["ARTEAN"], DocumentKind::ProductEan),
    (&["ART", "ARTE"], DocumentKind::ProductAndPackaging),
    (&["ART", "ARTEAN"], DocumentKind::ProductAndEan),
    (&["ARTE", "ARTEAN"], DocumentKind::PackagingAndEan),
    (&["ART", "ARTE", "ARTEAN"], DocumentKind::ProductPackagingAndEan),
    (&["KST"], DocumentKind::Customer),
];

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reception => "Reception",
            Self::ReceptionResponse => "ReceptionResponse",
            Self::Picking => "Picking",
            Self::PickingResponse => "PickingResponse",
            Self::Return => "Return",
            Self::ReturnResponse => "ReturnResponse",
            Self::CustomerDeliveryPreference => "CustomerDeliveryPreference",
            Self::Supplier => "Supplier",
            Self::Product => "Product",
            Self::ProductPackaging => "ProductPackaging",
            Self::ProductEan => "ProductEan",
            Self::ProductAndPackaging => "ProductAndPackaging",
            Self::ProductAndEan => "ProductAndEan",
            Self::PackagingAndEan => "PackagingAndEan",
            Self::ProductPackagingAndEan => "ProductPackagingAndEan",
            Self::Customer => "Customer",
            Self::Undefined => "Undefined",
        }
    }

    /// Human readable label
    pub fn description(self) -> &'static str {
        match self {
            Self::Reception => "Reception",
            Self::ReceptionResponse => "Reception confirmation",
            Self::Picking => "Picking",
            Self::PickingResponse => "Picking confirmation",
            Self::Return => "Return",
            Self::ReturnResponse => "Return confirmation",
            Self::CustomerDeliveryPreference => "Customer Delivery Preference",
            Self::Supplier => "Supplier",
            Self::Product => "Product",
            Self::ProductPackaging => "Product Packaging",
            Self::ProductEan => "Product EAN",
            Self::ProductAndPackaging => "Product and Product Packaging",
            Self::ProductAndEan => "Product and Product EAN",
            Self::PackagingAndEan => "Product Packaging and Product EAN",
            Self::ProductPackagingAndEan => "Product, Product Packaging and Product EAN",
            Self::Customer => "Customer",
            Self::Undefined => "Undefined",
        }
    }

    pub fn is_defined(self) -> bool {
        self != Self::Undefined
    }

    /// Detect the document carried by a decoded telegram.
    pub fn of(telegram: &Telegram) -> Self {
        detect(&telegram.observed_types())
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a set of record types to the document it makes up.
///
/// Only exact matches count; anything else is [`DocumentKind::Undefined`].
pub fn detect(types: &BTreeSet<String>) -> DocumentKind {
    let kind = DETECTION_TABLE
        .iter()
        .find(|(set, _)| {
            set.len() == types.len() && set.iter().zip(types).all(|(a, b)| *a == b.as_str())
        })
        .map_or(DocumentKind::Undefined, |(_, kind)| *kind);
    debug!(?types, kind = kind.as_str(), "document detected");
    kind
}
