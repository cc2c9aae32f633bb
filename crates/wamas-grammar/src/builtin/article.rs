//! Product master data: articles, packagings and barcodes

use crate::header::{Direction, with_header};
use crate::model::{DefaultFn, FieldSpec};
use crate::registry::RegistryBuilder;

pub(super) fn install(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .with_grammar(with_header(
            "ART",
            "ART000052",
            Direction::Outbound,
            vec![
                FieldSpec::string("Art_Mand", 3).with_default("000"),
                FieldSpec::string("Art_ArtNr", 20).with_key("default_code"),
                FieldSpec::string("Art_Var", 10).with_key("variant"),
                FieldSpec::string("Art_ArtBez", 40).with_key("name"),
                FieldSpec::string("Art_ArtBez2", 40).with_key("description"),
                FieldSpec::string("Art_Anzeige_Einheit", 10).with_key("uom_code"),
                FieldSpec::float("Art_Gew", 12, 3).with_key("weight"),
                FieldSpec::float("Art_Vol", 12, 3).with_key("volume"),
                FieldSpec::boolean("Art_Aktiv", 1).with_key("active").with_default("J"),
                FieldSpec::boolean("Art_ChargenPflicht", 1)
                    .with_key("tracking_lot")
                    .with_default("N"),
                FieldSpec::boolean("Art_MHD_Pflicht", 1)
                    .with_key("use_expiration_date")
                    .with_default("N"),
                FieldSpec::date("Art_AnlDatum", 8).with_default_fn(DefaultFn::CurrentDate),
            ],
        ))
        .with_grammar(with_header(
            "ARTE",
            "ARTE00052",
            Direction::Outbound,
            vec![
                FieldSpec::string("Arte_Mand", 3).with_default("000"),
                FieldSpec::string("Arte_ArtNr", 20).with_key("product_code"),
                FieldSpec::string("Arte_Var", 10).with_key("variant"),
                FieldSpec::string("Arte_Einheit", 10).with_key("uom_code"),
                FieldSpec::float("Arte_Menge", 12, 3).with_key("qty"),
                FieldSpec::float("Arte_Gew", 12, 3).with_key("weight"),
                FieldSpec::integer("Arte_Laenge", 6).with_key("length"),
                FieldSpec::integer("Arte_Breite", 6).with_key("width"),
                FieldSpec::integer("Arte_Hoehe", 6).with_key("height"),
                FieldSpec::boolean("Arte_BasisEinheit", 1)
                    .with_key("is_base_unit")
                    .with_default("N"),
            ],
        ))
        .with_grammar(with_header(
            "ARTEAN",
            "ARTEAN052",
            Direction::Outbound,
            vec![
                FieldSpec::string("ArtEan_Mand", 3).with_default("000"),
                FieldSpec::string("ArtEan_ArtNr", 20).with_key("product_code"),
                FieldSpec::string("ArtEan_Var", 10).with_key("variant"),
                FieldSpec::string("ArtEan_EST_Einheit", 10).with_key("uom_code"),
                FieldSpec::string("ArtEan_EAN", 20).with_key("barcode"),
                FieldSpec::boolean("ArtEan_HostEan", 1).with_default("J"),
            ],
        ))
        .with_unit_code_field("ART", "Art_Anzeige_Einheit")
        .with_unit_code_field("ARTE", "Arte_Einheit")
        .with_unit_code_field("ARTEAN", "ArtEan_EST_Einheit")
}
