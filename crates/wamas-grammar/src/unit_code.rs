//! Unit-of-measure codes between WAMAS and UBL

use indexmap::IndexMap;

/// Bidirectional unit-code table (WAMAS code ↔ UN/ECE code used in UBL)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitCodeMap {
    wamas_to_ubl: IndexMap<String, String>,
}

impl UnitCodeMap {
    /// Table shipped with the library
    pub fn builtin() -> Self {
        [
            ("BOT", "XBQ"),
            ("BOUT", "C62"),
            ("BOITE", "XBX"),
            ("LITRE", "LTR"),
            ("PET", "XBO"),
            ("TETRA", "X4B"),
        ]
        .into_iter()
        .fold(Self::default(), |map, (wamas, ubl)| map.with_pair(wamas, ubl))
    }

    /// Add or replace a pair
    pub fn with_pair(mut self, wamas: impl Into<String>, ubl: impl Into<String>) -> Self {
        self.wamas_to_ubl.insert(wamas.into(), ubl.into());
        self
    }

    /// UBL code for a WAMAS unit
    pub fn to_ubl(&self, wamas: &str) -> Option<&str> {
        self.wamas_to_ubl.get(wamas).map(String::as_str)
    }

    /// WAMAS unit for a UBL code; the first pair wins when several share a code
    pub fn to_wamas(&self, ubl: &str) -> Option<&str> {
        self.wamas_to_ubl
            .iter()
            .find(|(_, code)| code.as_str() == ubl)
            .map(|(wamas, _)| wamas.as_str())
    }

    /// All pairs, WAMAS code first
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.wamas_to_ubl
            .iter()
            .map(|(w, u)| (w.as_str(), u.as_str()))
    }
}
