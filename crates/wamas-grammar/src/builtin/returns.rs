//! Customer returns and their confirmations

use super::{doc, line};
use crate::header::{Direction, with_header};
use crate::model::{DefaultFn, FieldSpec, Party};
use crate::registry::RegistryBuilder;

pub(super) fn install(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .with_grammar(with_header(
            "KRETK",
            "KRETK0050",
            Direction::Outbound,
            vec![
                FieldSpec::string("Kretk_Mand", 3).with_default("000"),
                FieldSpec::string("Kretk_KretId_KretNr", 30).with_path(doc("cbc:ID")),
                FieldSpec::string("Kretk_KuNr", 13).with_path(doc(
                    "cac:DeliveryCustomerParty.cac:Party.cac:PartyIdentification.cbc:ID",
                )),
                FieldSpec::string("Kretk_KuName", 40).with_default_fn(DefaultFn::AddressName {
                    party: Party::DeliveryCustomer,
                    rank: 0,
                }),
                FieldSpec::date("Kretk_Datum", 8)
                    .with_path(doc("cbc:IssueDate"))
                    .with_default_fn(DefaultFn::CurrentDate),
                FieldSpec::string("Kretk_Grund", 40).with_path(doc("cbc:Note")),
            ],
        ))
        .with_grammar(with_header(
            "KRETP",
            "KRETP0050",
            Direction::Outbound,
            vec![
                FieldSpec::string("Kretp_Mand", 3).with_default("000"),
                FieldSpec::string("Kretp_KretId_KretNr", 30).with_path(doc("cbc:ID")),
                FieldSpec::integer("Kretp_PosNr", 5)
                    .with_path(line("cbc:ID"))
                    .with_default_fn(DefaultFn::LoopIndex),
                FieldSpec::string("Kretp_ArtNr", 20)
                    .with_path(line("cac:Item.cac:SellersItemIdentification.cbc:ID")),
                FieldSpec::string("Kretp_ArtBez", 40).with_path(line("cac:Item.cbc:Name")),
                FieldSpec::float("Kretp_Menge", 12, 3)
                    .with_path(line("cbc:DeliveredQuantity.#text")),
                FieldSpec::string("HostEinheit", 10)
                    .with_path(line("cbc:DeliveredQuantity.@unitCode")),
            ],
        ))
        .with_grammar(with_header(
            "KRETKQ",
            "KRETKQ050",
            Direction::Inbound,
            vec![
                FieldSpec::string("IvKretk_Mand", 3).with_default("000"),
                FieldSpec::string("IvKretk_KretId_KretNr", 30).with_path("Kretk_KretId_KretNr"),
                FieldSpec::string("IvKretk_KuNr", 13).with_path("Kretk_KuNr"),
                FieldSpec::date("IvKretk_Datum", 8)
                    .with_path("Kretk_Datum")
                    .with_default_fn(DefaultFn::CurrentDate),
                FieldSpec::string("IvKretk_Status", 10).with_default("ABGESCHL"),
            ],
        ))
        .with_grammar(with_header(
            "KRETPQ",
            "KRETPQ050",
            Direction::Inbound,
            vec![
                FieldSpec::string("IvKretp_Mand", 3).with_default("000"),
                FieldSpec::string("IvKretp_KretId_KretNr", 30).with_path("Kretp_KretId_KretNr"),
                FieldSpec::integer("IvKretp_PosNr", 5).with_path("Kretp_PosNr"),
                FieldSpec::string("IvKretp_ArtNr", 20).with_path("Kretp_ArtNr"),
                FieldSpec::float("IvKretp_AnmMngs_Mng", 12, 3).with_path("Kretp_Menge"),
                FieldSpec::string("IvKretp_AnmMngs_Einheit", 10).with_path("HostEinheit"),
            ],
        ))
        .with_unit_code_field("KRETP", "HostEinheit")
        .with_conversion("KRETK", &["KRETKQ"])
        .with_conversion("KRETP", &["KRETPQ"])
}
