//! Partner master data: customers, customer delivery preferences, suppliers

use crate::header::{Direction, with_header};
use crate::model::FieldSpec;
use crate::registry::RegistryBuilder;

/// Name and address block shared by the delivery (`LiefAdrs`) and invoicing
/// (`Adrs`) addresses of a customer.
fn address_block(prefix: &str, key_prefix: &str) -> Vec<FieldSpec> {
    let field = |name: &str| format!("{prefix}_{name}");
    let key = |name: &str| format!("{key_prefix}_{name}");
    vec![
        FieldSpec::string(field("Name"), 40).with_key(key("name")),
        FieldSpec::string(field("Name2"), 40),
        FieldSpec::string(field("Name3"), 40),
        FieldSpec::string(field("Name4"), 40),
        FieldSpec::string(field("Anrede"), 15),
        FieldSpec::string(field("Adr"), 40).with_key(key("street")),
        FieldSpec::string(field("Adr2"), 40).with_key(key("street2")),
        FieldSpec::string(field("PLZ"), 10).with_key(key("zip")),
        FieldSpec::string(field("Ort"), 40).with_key(key("city")),
        FieldSpec::string(field("OrtTeil"), 40).with_key(key("state")),
        FieldSpec::string(field("Land"), 4).with_key(key("country_code")),
        FieldSpec::string(field("Tel"), 35).with_key(key("phone")),
        FieldSpec::string(field("Fax"), 35),
        FieldSpec::string(field("Email"), 40).with_key(key("email")),
        FieldSpec::string(field("WWW"), 35).with_key(key("website")),
        FieldSpec::string(field("ILN"), 13),
    ]
}

fn customer_fields() -> Vec<FieldSpec> {
    let mut fields = vec![
        FieldSpec::string("Kst_Mand", 3).with_default("000"),
        FieldSpec::string("Kst_KuNr", 13).with_key("ref"),
    ];
    fields.extend(address_block("Kst_LiefAdrs", "delivery"));
    fields.extend(address_block("Kst_Adrs", "invoicing"));
    fields.extend([
        FieldSpec::string("Kst_DVRNr", 15),
        FieldSpec::string("Kst_UIDNr", 15),
        FieldSpec::integer("Kst_LokKstTyp_MaxTEHoehe", 6),
        FieldSpec::string("Kst_KSTTYP_KstTypId", 10).with_default("Standard"),
        FieldSpec::boolean("Kst_LokKstTyp_EanQuittErl", 1).with_default("J"),
        FieldSpec::boolean("Kst_LokKstTyp_EartErl", 1).with_default("N"),
        FieldSpec::boolean("Kst_LokKstTyp_EMatQErl", 1).with_default("N"),
        FieldSpec::boolean("Kst_LokKstTyp_EtikettKz", 1).with_default("N"),
        FieldSpec::boolean("Kst_LokKstTyp_FeldKQuittErl", 1).with_default("J"),
        FieldSpec::boolean("Kst_LokKstTyp_FeldQuittErl", 1).with_default("J"),
        FieldSpec::boolean("Kst_LokKstTyp_KomGewInitKz", 1).with_default("N"),
        FieldSpec::boolean("Kst_LokKstTyp_KomMngInitKz", 1).with_default("J"),
        FieldSpec::boolean("Kst_LokKstTyp_KomPosInitKz", 1).with_default("J"),
        FieldSpec::boolean("Kst_LokKstTyp_KontErl", 1).with_default("N"),
        FieldSpec::integer("Kst_LokKstTyp_KontIntWa", 4),
        FieldSpec::string("Kst_LokKstTyp_KstGrp", 5),
        FieldSpec::integer("Kst_LokKstTyp_LiefSAnz", 1),
        FieldSpec::string("Kst_LokKstTyp_LiefSLay", 20).with_default("Standard"),
        FieldSpec::boolean("Kst_LokKstTyp_MkkErl", 1).with_default("N"),
        FieldSpec::boolean("Kst_LokKstTyp_OkQuittErl", 1).with_default("N"),
        FieldSpec::boolean("Kst_LokKstTyp_TeQuittErl", 1).with_default("J"),
        FieldSpec::boolean("Kst_LokKstTyp_UeberliefErl", 1).with_default("N"),
        FieldSpec::string("Kst_SatzKz", 1),
        FieldSpec::boolean("Kst_SperrKzWa", 1),
    ]);
    fields
}

pub(super) fn install(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .with_grammar(with_header(
            "KST",
            "KST000052",
            Direction::Outbound,
            customer_fields(),
        ))
        .with_grammar(with_header(
            "KSTAUS",
            "KSTAUS051",
            Direction::Outbound,
            vec![
                FieldSpec::string("KstAus_Mand", 3).with_default("000"),
                FieldSpec::string("KstAus_KuNr", 13).with_key("ref"),
                FieldSpec::string("KstAus_LagIdKom", 10).with_key("picking_zone"),
                FieldSpec::integer("KstAus_Prio", 3).with_key("priority").with_default("1"),
                FieldSpec::integer("KstAus_MHD_RestTage", 4).with_key("min_shelf_life_days"),
                FieldSpec::boolean("KstAus_ChargenRein", 1)
                    .with_key("single_lot")
                    .with_default("N"),
            ],
        ))
        .with_grammar(with_header(
            "LST",
            "LST000051",
            Direction::Outbound,
            vec![
                FieldSpec::string("Lst_Mand", 3).with_default("000"),
                FieldSpec::string("Lst_LiefNr", 13).with_key("ref"),
                FieldSpec::string("Lst_Name", 40).with_key("name"),
                FieldSpec::string("Lst_Adr", 40).with_key("street"),
                FieldSpec::string("Lst_PLZ", 10).with_key("zip"),
                FieldSpec::string("Lst_Ort", 40).with_key("city"),
                FieldSpec::string("Lst_Land", 4).with_key("country_code"),
                FieldSpec::string("Lst_Tel", 35).with_key("phone"),
                FieldSpec::string("Lst_Email", 40).with_key("email"),
                FieldSpec::boolean("Lst_SperrKz", 1).with_default("N"),
            ],
        ))
}
