use chrono::{TimeZone, Utc};
use wamas_codec::{
    DecodeOptions, EncodeOptions, EncodePlan, Error, TelegramEncoder, decode_stream,
    lines_to_bytes, remap_telegram,
};
use wamas_grammar::{DESPATCH_LINE, GrammarRegistry};
use wamas_record::{GenericRecord, Value};

fn options() -> EncodeOptions {
    EncodeOptions::default()
        .with_now(Utc.with_ymd_and_hms(2023, 5, 1, 6, 57, 23).unwrap())
        .with_seed(2023)
}

fn picking_order() -> GenericRecord {
    GenericRecord::from_json_str(
        r##"{
        "DespatchAdvice": {
            "cbc:ID": "OUT/0042",
            "cac:OrderReference": {"cbc:ID": "SO-77"},
            "cac:DeliveryCustomerParty": {"cac:Party": {
                "cac:PartyIdentification": {"cbc:ID": "C-100"},
                "cac:PartyName": {"cbc:Name": "Käserei Bühler"},
                "cac:PostalAddress": {
                    "cbc:StreetName": "Hauptstrasse 1",
                    "cbc:CityName": "Luzern",
                    "cbc:PostalZone": "6003",
                    "cac:Country": {"cbc:IdentificationCode": "CH"}
                }
            }},
            "cac:Shipment": {"cac:Delivery": {"cac:RequestedDeliveryPeriod": {
                "cbc:StartDate": "2023-05-02"
            }}},
            "cac:DespatchLine": [
                {
                    "cbc:ID": "1",
                    "cbc:DeliveredQuantity": {"@unitCode": "XBQ", "#text": "3.6"},
                    "cac:Item": {
                        "cbc:Name": "Bergkäse mild",
                        "cac:SellersItemIdentification": {"cbc:ID": "ART-1"}
                    }
                },
                {
                    "cbc:ID": "2",
                    "cbc:DeliveredQuantity": {"@unitCode": "C62", "#text": "12"},
                    "cac:Item": {
                        "cbc:Name": "Rahm",
                        "cac:SellersItemIdentification": {"cbc:ID": "ART-2"}
                    }
                }
            ]
        }
    }"##,
    )
    .unwrap()
}

fn picking_telegram(registry: &GrammarRegistry) -> Vec<u8> {
    let plan = EncodePlan::new()
        .then("AUSK")
        .then_repeated("AUSP", DESPATCH_LINE);
    let lines = TelegramEncoder::new(registry, options())
        .encode_records(&picking_order(), &plan)
        .unwrap();
    lines_to_bytes(&lines)
}

#[test]
fn test_encoded_lines_match_grammar_width() {
    let registry = GrammarRegistry::builtin();
    let bytes = picking_telegram(&registry);
    let text = wamas_codec::latin1::decode(&bytes);

    let widths: Vec<usize> = text.split('\n').map(|l| l.chars().count()).collect();
    assert_eq!(
        widths,
        [
            registry.grammar("AUSK").unwrap().width(),
            registry.grammar("AUSP").unwrap().width(),
            registry.grammar("AUSP").unwrap().width(),
        ]
    );
    assert!(bytes.contains(&0xE4), "umlauts are written as Latin-1");
}

#[test]
fn test_decode_reads_back_encoded_values() {
    let registry = GrammarRegistry::builtin();
    let telegram = decode_stream(
        &picking_telegram(&registry),
        &registry,
        &DecodeOptions::default(),
    )
    .unwrap();

    let head = &telegram.lines("AUSK")[0];
    assert_eq!(head.header.source, "ODOO");
    assert_eq!(head.header.destination, "WAMAS");
    assert_eq!(head.header.sequence, 1);
    assert_eq!(head.header.created_at, "20230501085723");
    assert_eq!(head.fields.get("Ausk_AusId_AusNr"), Some(&Value::from("OUT/0042")));
    assert_eq!(
        head.fields.get("Ausk_LiefAdrs_Name"),
        Some(&Value::from("Käserei Bühler"))
    );
    assert_eq!(
        head.fields.get("Ausk_LiefAdrs_Adr"),
        Some(&Value::from("Hauptstrasse 1"))
    );

    let items = telegram.lines("AUSP");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].fields.get("Ausp_Menge"), Some(&Value::Decimal(3.6)));
    assert_eq!(items[0].fields.get("HostEinheit"), Some(&Value::from("BOT")));
    assert_eq!(items[1].fields.get("HostEinheit"), Some(&Value::from("BOUT")));
    assert_eq!(items[1].fields.get("Ausp_PosNr"), Some(&Value::Integer(2)));
}

#[test]
fn test_picking_confirmation_links_units_to_lines() {
    let registry = GrammarRegistry::builtin();
    let order = decode_stream(
        &picking_telegram(&registry),
        &registry,
        &DecodeOptions::default(),
    )
    .unwrap();

    let mut encoder = TelegramEncoder::new(&registry, options());
    let lines = remap_telegram(&mut encoder, &order).unwrap();
    let types: Vec<&str> = lines.iter().map(|l| l.record_type.as_str()).collect();
    assert_eq!(types, ["AUSKQ", "WATEKQ", "WATEPQ", "WATEPQ"]);

    let confirmation =
        decode_stream(&lines_to_bytes(&lines), &registry, &DecodeOptions::default()).unwrap();
    let unit_id = confirmation.lines("WATEKQ")[0]
        .fields
        .get("IvTek_TeId")
        .cloned()
        .unwrap();
    assert_eq!(unit_id.to_text().len(), 18);

    for (seq, line) in confirmation.lines("WATEPQ").iter().enumerate() {
        assert_eq!(line.fields.get("IvTep_TeId"), Some(&unit_id));
        assert_eq!(
            line.fields.get("IvAusp_UrAusId_AusNr"),
            Some(&Value::from("OUT/0042"))
        );
        assert_eq!(line.header.sequence, seq as i64 + 3);
        assert_eq!(line.header.source, "WAMAS");
    }
    assert_eq!(
        confirmation.lines("WATEPQ")[0].fields.get("Mngs_Mng"),
        Some(&Value::Decimal(3.6))
    );
    assert_eq!(
        confirmation.lines("WATEKQ")[0].fields.get("IvTek_VersDatum"),
        Some(&Value::from("20230502"))
    );
    // no timezone shift when copying between WAMAS telegrams
    assert_eq!(
        confirmation.lines("AUSKQ")[0].fields.get("IvAusk_QuittZeit"),
        Some(&Value::from("20230501065723"))
    );
}

#[test]
fn test_confirmations_are_not_remapped_again() {
    let registry = GrammarRegistry::builtin();
    let order = decode_stream(
        &picking_telegram(&registry),
        &registry,
        &DecodeOptions::default(),
    )
    .unwrap();
    let mut encoder = TelegramEncoder::new(&registry, options());
    let lines = remap_telegram(&mut encoder, &order).unwrap();
    let confirmation =
        decode_stream(&lines_to_bytes(&lines), &registry, &DecodeOptions::default()).unwrap();

    let err = remap_telegram(&mut encoder, &confirmation).unwrap_err();
    assert!(matches!(err, Error::UnsupportedConversion(_)));
}

#[test]
fn test_shipping_unit_line_tolerates_one_missing_character() {
    let registry = GrammarRegistry::builtin();
    let order = decode_stream(
        &picking_telegram(&registry),
        &registry,
        &DecodeOptions::default(),
    )
    .unwrap();
    let mut encoder = TelegramEncoder::new(&registry, options());
    let lines = remap_telegram(&mut encoder, &order).unwrap();

    let mut unit_line = lines[1].to_line();
    assert!(unit_line.starts_with("WAMAS"));
    unit_line.pop();
    let telegram = decode_stream(unit_line.as_bytes(), &registry, &DecodeOptions::default())
        .unwrap();
    assert_eq!(telegram.lines("WATEKQ").len(), 1);

    let mut order_line = lines[0].to_line();
    order_line.pop();
    assert!(matches!(
        decode_stream(order_line.as_bytes(), &registry, &DecodeOptions::default()),
        Err(Error::LengthMismatch { .. })
    ));
}

#[test]
fn test_customer_preferences_written_per_picking_zone() {
    let registry = GrammarRegistry::builtin();
    let mut customer = GenericRecord::new();
    customer.insert("ref", "C-100");
    customer.insert("min_shelf_life_days", 14i64);

    let lines = TelegramEncoder::new(&registry, options())
        .encode_records(&customer, &EncodePlan::from_types(&["KSTAUS"]))
        .unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].fields["KstAus_LagIdKom"].trim_end(), "kMEZ");
    assert_eq!(lines[1].fields["KstAus_LagIdKom"].trim_end(), "kPAR");
    assert_eq!(lines[1].fields["KstAus_Prio"], "001");
    assert_eq!(lines[1].fields["Telheader_TelSeq"], "000002");
}
