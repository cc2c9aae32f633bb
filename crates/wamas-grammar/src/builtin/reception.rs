//! Goods receipt: announcements to the warehouse and their confirmations

use super::{doc, line};
use crate::header::{Direction, with_header};
use crate::model::{DefaultFn, FieldSpec, Interval, Party};
use crate::registry::RegistryBuilder;

pub(super) fn install(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .with_grammar(with_header(
            "WEAK",
            "WEAK00050",
            Direction::Outbound,
            vec![
                FieldSpec::string("Weak_Mand", 3).with_default("000"),
                FieldSpec::string("Weak_WevId_WevNr", 30).with_path(doc("cbc:ID")),
                FieldSpec::string("Weak_LiefNr", 13).with_path(doc(
                    "cac:DespatchSupplierParty.cac:Party.cac:PartyIdentification.cbc:ID",
                )),
                FieldSpec::string("Weak_LiefName", 40).with_default_fn(DefaultFn::AddressName {
                    party: Party::DespatchSupplier,
                    rank: 0,
                }),
                FieldSpec::string("Weak_BestNr", 30).with_path(doc("cac:OrderReference.cbc:ID")),
                FieldSpec::date("Weak_AvisDatum", 8)
                    .with_path(doc("cbc:IssueDate"))
                    .with_default_fn(DefaultFn::CurrentDate),
                FieldSpec::date("Weak_ErwDatum", 8)
                    .with_path(doc(
                        "cac:Shipment.cac:Delivery.cac:RequestedDeliveryPeriod.cbc:StartDate",
                    ))
                    .with_default_fn(DefaultFn::DateFromField {
                        field: "Weak_AvisDatum".to_string(),
                        amount: 1,
                        unit: Interval::Days,
                    }),
                FieldSpec::string("Weak_Bemerkung", 80).with_alternatives(&[
                    doc("cbc:Note"),
                    doc("cac:Shipment.cbc:SpecialInstructions"),
                ]),
            ],
        ))
        .with_grammar(with_header(
            "WEAP",
            "WEAP00050",
            Direction::Outbound,
            vec![
                FieldSpec::string("Weap_Mand", 3).with_default("000"),
                FieldSpec::string("Weap_WevId_WevNr", 30).with_path(doc("cbc:ID")),
                FieldSpec::integer("Weap_PosNr", 5)
                    .with_path(line("cbc:ID"))
                    .with_default_fn(DefaultFn::LoopIndex),
                FieldSpec::string("Weap_ArtNr", 20)
                    .with_path(line("cac:Item.cac:SellersItemIdentification.cbc:ID")),
                FieldSpec::string("Weap_ArtBez", 40).with_path(line("cac:Item.cbc:Name")),
                FieldSpec::float("Weap_Menge", 12, 3)
                    .with_path(line("cbc:DeliveredQuantity.#text")),
                FieldSpec::string("HostEinheit", 10)
                    .with_path(line("cbc:DeliveredQuantity.@unitCode")),
                FieldSpec::string("Weap_Charge", 20).with_conditional(&[
                    (
                        line("cac:Item.cac:ItemInstance.cac:LotIdentification"),
                        line("cac:Item.cac:ItemInstance.cac:LotIdentification.cbc:LotNumberID"),
                    ),
                    (
                        line("cac:Item.cac:ItemInstance"),
                        line("cac:Item.cac:ItemInstance.cbc:SerialID"),
                    ),
                ]),
                FieldSpec::date("Weap_MHD", 8).with_path(line(
                    "cac:Item.cac:ItemInstance.cac:LotIdentification.cbc:ExpiryDate",
                )),
            ],
        ))
        .with_grammar(with_header(
            "WEAKQ",
            "WEAKQ0050",
            Direction::Inbound,
            vec![
                FieldSpec::string("IvWevk_Mand", 3).with_default("000"),
                FieldSpec::string("IvWevk_WevId_WevNr", 30).with_path("Weak_WevId_WevNr"),
                FieldSpec::string("IvWevk_LiefNr", 13).with_path("Weak_LiefNr"),
                FieldSpec::string("IvWevk_BestNr", 30).with_path("Weak_BestNr"),
                FieldSpec::datetime("IvWevk_AnkZeit", 14)
                    .with_default_fn(DefaultFn::CurrentDatetime),
                FieldSpec::string("IvWevk_Status", 10).with_default("ABGESCHL"),
            ],
        ))
        .with_grammar(with_header(
            "WEAPQ",
            "WEAPQ0050",
            Direction::Inbound,
            vec![
                FieldSpec::string("IvWevp_Mand", 3).with_default("000"),
                FieldSpec::string("IvWevp_WevId_WevNr", 30).with_path("Weap_WevId_WevNr"),
                FieldSpec::integer("IvWevp_PosNr", 5).with_path("Weap_PosNr"),
                FieldSpec::string("IvWevp_ArtNr", 20).with_path("Weap_ArtNr"),
                FieldSpec::float("IvWevp_LiefMngs_Mng", 12, 3).with_path("Weap_Menge"),
                FieldSpec::string("IvWevp_LiefMngs_Einheit", 10).with_path("HostEinheit"),
                FieldSpec::string("IvWevp_Charge", 20).with_path("Weap_Charge"),
                FieldSpec::date("IvWevp_MHD", 8)
                    .with_path("Weap_MHD")
                    .with_default_fn(DefaultFn::DateFromField {
                        field: "Telheader_AnlZeit".to_string(),
                        amount: 730,
                        unit: Interval::Days,
                    }),
            ],
        ))
        .with_unit_code_field("WEAP", "HostEinheit")
        .with_conversion("WEAK", &["WEAKQ"])
        .with_conversion("WEAP", &["WEAPQ"])
}
