use chrono::NaiveDate;
use orbiter_core::markup::{format_long_date, parse_date};
use orbiter_core::{tokenize, Component, KeyValue, KvValue, ValueDecodeError};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn single_key_value(text: &str) -> KeyValue {
    let list = tokenize(text).unwrap();
    assert_eq!(list.len(), 1, "`{text}` should be one fragment");
    list.get(0)
        .and_then(Component::as_key_value)
        .cloned()
        .unwrap_or_else(|| panic!("`{text}` is not a key-value"))
}

#[test]
fn typed_values_re_encode_to_equivalent_tags() {
    let cases = [
        ("#[[n: 42]]", KvValue::Int(42), "#[[n: 42]]"),
        ("#[[n: 3.5]]", KvValue::Float(3.5), "#[[n: 3.5]]"),
        (
            "#[[due: 2020-08-31]]",
            KvValue::Date(date(2020, 8, 31)),
            "#[[due: 2020-08-31]]",
        ),
        (
            "#[[due: August 8th, 2020]]",
            KvValue::Date(date(2020, 8, 8)),
            "#[[due: 2020-08-08]]",
        ),
        (
            "#[[due: [[August 8th, 2020]]]]",
            KvValue::Date(date(2020, 8, 8)),
            "#[[due: 2020-08-08]]",
        ),
    ];

    for (source, value, canonical) in cases {
        let kv = single_key_value(source);
        assert_eq!(kv.value(), &value, "value of `{source}`");
        assert_eq!(kv.to_markup(), source);
        assert_eq!(kv.canonical_markup(), canonical);

        let reparsed = single_key_value(canonical);
        assert_eq!(reparsed, kv);
    }
}

#[test]
fn plain_strings_fall_back_to_text() {
    let kv = single_key_value("#[[feedback: ThoughtProvoking]]");
    assert_eq!(kv.key(), "feedback");
    assert_eq!(kv.value().as_text(), Some("ThoughtProvoking"));
    assert!(kv.is_canonical());

    let err: ValueDecodeError = KvValue::decode("ThoughtProvoking").unwrap_err();
    assert_eq!(err.raw, "ThoughtProvoking");
}

#[test]
fn value_keeps_everything_after_first_separator() {
    let kv = single_key_value("#[[note: a: b]]");
    assert_eq!(kv.key(), "note");
    assert_eq!(kv.value(), &KvValue::Text("a: b".into()));
}

#[test]
fn floats_encode_with_one_decimal() {
    let mut kv = single_key_value("#[[factor: 2.76]]");
    assert_eq!(kv.to_markup(), "#[[factor: 2.76]]");
    kv.normalize();
    assert_eq!(kv.to_markup(), "#[[factor: 2.8]]");
}

#[test]
fn long_dates_round_trip_through_helpers() {
    for (day, spelled) in [
        (1, "October 1st, 2026"),
        (2, "October 2nd, 2026"),
        (3, "October 3rd, 2026"),
        (11, "October 11th, 2026"),
        (23, "October 23rd, 2026"),
    ] {
        let value = date(2026, 10, day);
        assert_eq!(format_long_date(value), spelled);
        assert_eq!(parse_date(spelled), Some(value));
    }
    assert_eq!(parse_date("2026-02-30"), None);
}
