//! Picking orders and their confirmations (order, shipping units, unit lines)

use super::{doc, line};
use crate::header::{Direction, with_header};
use crate::model::{DefaultFn, FieldSpec, Party};
use crate::registry::RegistryBuilder;

const CUSTOMER_ADDRESS: &str = "cac:DeliveryCustomerParty.cac:Party.cac:PostalAddress";

fn customer_address(path: &str) -> String {
    doc(&format!("{CUSTOMER_ADDRESS}.{path}"))
}

fn delivery_name(name: &str, rank: usize) -> FieldSpec {
    FieldSpec::string(name, 40).with_default_fn(DefaultFn::AddressName {
        party: Party::DeliveryCustomer,
        rank,
    })
}

pub(super) fn install(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .with_grammar(with_header(
            "AUSK",
            "AUSK00050",
            Direction::Outbound,
            vec![
                FieldSpec::string("Ausk_Mand", 3).with_default("000"),
                FieldSpec::string("Ausk_AusId_AusNr", 30).with_path(doc("cbc:ID")),
                FieldSpec::string("Ausk_BestNr", 30).with_path(doc("cac:OrderReference.cbc:ID")),
                FieldSpec::string("Ausk_KuNr", 13).with_path(doc(
                    "cac:DeliveryCustomerParty.cac:Party.cac:PartyIdentification.cbc:ID",
                )),
                delivery_name("Ausk_LiefAdrs_Name", 0),
                delivery_name("Ausk_LiefAdrs_Name2", 1),
                delivery_name("Ausk_LiefAdrs_Name3", 2),
                delivery_name("Ausk_LiefAdrs_Name4", 3),
                FieldSpec::string("Ausk_LiefAdrs_Adr", 40).with_default_fn(
                    DefaultFn::AddressStreet {
                        party: Party::DeliveryCustomer,
                    },
                ),
                FieldSpec::string("Ausk_LiefAdrs_PLZ", 10)
                    .with_path(customer_address("cbc:PostalZone")),
                FieldSpec::string("Ausk_LiefAdrs_Ort", 40)
                    .with_path(customer_address("cbc:CityName")),
                FieldSpec::string("Ausk_LiefAdrs_Land", 4)
                    .with_path(customer_address("cac:Country.cbc:IdentificationCode")),
                FieldSpec::string("Ausk_AbsAdrs_Name", 40).with_default_fn(
                    DefaultFn::AddressName {
                        party: Party::DespatchSupplier,
                        rank: 0,
                    },
                ),
                FieldSpec::date("Ausk_LiefDatum", 8)
                    .with_path(doc(
                        "cac:Shipment.cac:Delivery.cac:RequestedDeliveryPeriod.cbc:StartDate",
                    ))
                    .with_default_fn(DefaultFn::CurrentDate),
                FieldSpec::string("Ausk_Bemerkung", 80).with_alternatives(&[
                    doc("cbc:Note"),
                    doc("cac:Shipment.cbc:SpecialInstructions"),
                ]),
            ],
        ))
        .with_grammar(with_header(
            "AUSP",
            "AUSP00050",
            Direction::Outbound,
            vec![
                FieldSpec::string("Ausp_Mand", 3).with_default("000"),
                FieldSpec::string("Ausp_AusId_AusNr", 30).with_path(doc("cbc:ID")),
                FieldSpec::integer("Ausp_PosNr", 5)
                    .with_path(line("cbc:ID"))
                    .with_default_fn(DefaultFn::LoopIndex),
                FieldSpec::string("Ausp_ArtNr", 20)
                    .with_path(line("cac:Item.cac:SellersItemIdentification.cbc:ID")),
                FieldSpec::string("Ausp_ArtBez", 40).with_path(line("cac:Item.cbc:Name")),
                FieldSpec::float("Ausp_Menge", 12, 3)
                    .with_path(line("cbc:DeliveredQuantity.#text")),
                FieldSpec::string("HostEinheit", 10)
                    .with_path(line("cbc:DeliveredQuantity.@unitCode")),
                FieldSpec::string("Ausp_BestPosNr", 10)
                    .with_path(line("cac:OrderLineReference.cbc:LineID")),
                FieldSpec::string("Ausp_Charge", 20).with_conditional(&[(
                    line("cac:Item.cac:ItemInstance.cac:LotIdentification"),
                    line("cac:Item.cac:ItemInstance.cac:LotIdentification.cbc:LotNumberID"),
                )]),
            ],
        ))
        .with_grammar(with_header(
            "AUSKQ",
            "AUSKQ0051",
            Direction::Inbound,
            vec![
                FieldSpec::string("IvAusk_Mand", 3).with_default("000"),
                FieldSpec::string("IvAusk_AusId_AusNr", 30).with_path("Ausk_AusId_AusNr"),
                FieldSpec::string("IvAusk_BestNr", 30).with_path("Ausk_BestNr"),
                FieldSpec::string("IvAusk_KuNr", 13).with_path("Ausk_KuNr"),
                FieldSpec::date("IvAusk_LiefDatum", 8).with_path("Ausk_LiefDatum"),
                FieldSpec::string("IvAusk_Status", 10).with_default("ABGESCHL"),
                FieldSpec::datetime("IvAusk_QuittZeit", 14)
                    .with_default_fn(DefaultFn::CurrentDatetime),
            ],
        ))
        .with_grammar(with_header(
            "WATEKQ",
            "WATEKQ051",
            Direction::Inbound,
            vec![
                FieldSpec::string("IvTek_Mand", 3).with_default("000"),
                FieldSpec::string("IvTek_TeId", 18).with_default_fn(DefaultFn::RandomDigits),
                FieldSpec::string("IvTek_AusId_AusNr", 30).with_path("Ausk_AusId_AusNr"),
                FieldSpec::string("IvTek_TeTyp", 10).with_default("PALETTE"),
                FieldSpec::float("IvTek_GesGew", 12, 3),
                FieldSpec::string("IvTek_Quai", 10).with_default_fn(DefaultFn::RandomQuai),
                FieldSpec::date("IvTek_VersDatum", 8)
                    .with_path("Ausk_LiefDatum")
                    .with_default_fn(DefaultFn::CurrentDate),
            ],
        ))
        .with_grammar(with_header(
            "WATEPQ",
            "WATEPQ051",
            Direction::Inbound,
            vec![
                FieldSpec::string("IvTep_Mand", 3).with_default("000"),
                FieldSpec::string("IvTep_TeId", 18).with_default_fn(DefaultFn::ParentId),
                FieldSpec::string("IvAusp_UrAusId_AusNr", 30).with_path("Ausp_AusId_AusNr"),
                FieldSpec::integer("IvAusp_PosNr", 5).with_path("Ausp_PosNr"),
                FieldSpec::string("IvTep_ArtNr", 20).with_path("Ausp_ArtNr"),
                FieldSpec::string("IvTep_ArtBez", 40).with_path("Ausp_ArtBez"),
                FieldSpec::float("Mngs_Mng", 12, 3).with_path("Ausp_Menge"),
                FieldSpec::string("Mngs_Einheit", 10).with_path("HostEinheit"),
                FieldSpec::string("IvTep_Charge", 20).with_path("Ausp_Charge"),
                FieldSpec::date("IvTep_MHD", 8),
            ],
        ))
        .with_unit_code_field("AUSP", "HostEinheit")
        .with_conversion("AUSK", &["AUSKQ", "WATEKQ"])
        .with_conversion("AUSP", &["WATEPQ"])
        .with_parent_key("WATEKQ", "IvTek_TeId")
        .with_child_key("WATEPQ", "IvTep_TeId", "IvTek_TeId")
        .with_off_by_one("WATEKQ")
        .with_non_ascii_repair("WATEPQ", "IvTep_ArtBez")
}
