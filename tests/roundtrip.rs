use rstest::rstest;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabwire::{
    DelimiterCache, LineEnding, ParseOptions, SerializeOptions,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Record {
    id: i64,
    name: String,
    score: f64,
    active: bool,
}

fn sample_records() -> Vec<Record> {
    vec![
        Record {
            id: 1,
            name: "Ada".to_string(),
            score: 99.5,
            active: true,
        },
        Record {
            id: 2,
            name: "Doe, John".to_string(),
            score: 7.25,
            active: false,
        },
        Record {
            id: 3,
            name: "say \"hi\"".to_string(),
            score: 0.5,
            active: true,
        },
    ]
}

#[rstest]
fn typed_round_trip_with_coercion_both_ways() {
    let records = sample_records();
    let text = tabwire::to_string(&records).unwrap();
    let options = ParseOptions::new().with_coerce_types(true);
    let round_trip: Vec<Record> = tabwire::from_str_with_options(&text, &options).unwrap();
    assert_eq!(records, round_trip);
}

#[rstest]
fn serialize_parse_serialize_is_byte_identical() {
    let original = json!([
        {"id": 1, "name": "Ada", "note": "multi\nline"},
        {"id": 2, "name": "=SUM(A1)", "note": "say \"hi\""},
        {"id": 3, "name": null, "note": "a,b"}
    ]);
    let options = ParseOptions::new().with_coerce_types(true);

    let first = tabwire::to_string(&original).unwrap();
    let rows = tabwire::parse_str_with_options(&first, &options).unwrap();
    let second = tabwire::to_string(&rows).unwrap();
    assert_eq!(first, second);
}

#[rstest]
fn embedded_newlines_round_trip() {
    let records = json!([{"id": "1", "note": "line1\nline2"}]);
    let text = tabwire::to_string(&records).unwrap();
    assert_eq!(text, "id,note\n1,\"line1\nline2\"\n");
    let rows = tabwire::parse_str(&text).unwrap();
    assert_eq!(rows, json!([{"id": "1", "note": "line1\nline2"}]).as_array().unwrap().clone());
}

#[rstest]
#[case("=SUM(A1)", "'=SUM(A1)")]
#[case("+1+2", "'+1+2")]
#[case("@import", "'@import")]
#[case("-divert", "'-divert")]
fn formula_values_are_neutralized_on_output(#[case] value: &str, #[case] cell: &str) {
    let text = tabwire::to_string(&json!([{"v": value}])).unwrap();
    assert_eq!(text, format!("v\n{cell}\n"));
}

#[rstest]
fn safe_values_are_emitted_unchanged() {
    let text = tabwire::to_string(&json!([{"v": "hello"}, {"v": "x=1"}])).unwrap();
    assert_eq!(text, "v\nhello\nx=1\n");
}

#[rstest]
fn neutralization_survives_a_double_round_trip() {
    let original = json!([{"cmd": "=2+5"}]);
    let text = tabwire::to_string(&original).unwrap();
    assert_eq!(text, "cmd\n'=2+5\n");

    // Parse strips the marker; a second serialize re-adds exactly one.
    let rows = tabwire::parse_str(&text).unwrap();
    assert_eq!(rows[0]["cmd"], "=2+5");
    let again = tabwire::to_string(&rows).unwrap();
    assert_eq!(again, text);
}

#[rstest]
fn bidi_override_controls_are_stripped() {
    let text = tabwire::to_string(&json!([{"v": "abc\u{202E}def"}])).unwrap();
    assert_eq!(text, "v\nabcdef\n");
}

#[rstest]
fn crlf_and_bom_options() {
    let options = SerializeOptions::new()
        .with_line_ending(LineEnding::CrLf)
        .with_bom(true);
    let text = tabwire::to_string_with_options(&json!([{"a": "1"}]), &options).unwrap();
    assert_eq!(text, "\u{FEFF}a\r\n1\r\n");

    // The parser strips the marker again on the way back in.
    let rows = tabwire::parse_str(&text).unwrap();
    assert_eq!(rows, vec![json!({"a": "1"})]);
}

#[rstest]
fn custom_delimiter_round_trip() {
    let options = SerializeOptions::new().with_delimiter(';');
    let text = tabwire::to_string_with_options(
        &json!([{"a": "x;y", "b": "plain"}]),
        &options,
    )
    .unwrap();
    assert_eq!(text, "a;b\n\"x;y\";plain\n");

    let rows = tabwire::parse_str(&text).unwrap();
    assert_eq!(rows, vec![json!({"a": "x;y", "b": "plain"})]);
}

#[rstest]
fn detection_is_deterministic_and_cache_transparent() {
    let sample = "a;b;c\n1;2;3\n4;5;6";
    let candidates = [';', ',', '\t', '|'];
    let direct = tabwire::detect_delimiter(sample, &candidates);

    let cache = DelimiterCache::new(4);
    let miss = cache.detect(sample, &candidates);
    let hit = cache.detect(sample, &candidates);
    assert_eq!(direct, miss);
    assert_eq!(miss, hit);

    for _ in 0..5 {
        assert_eq!(tabwire::detect_delimiter(sample, &candidates), direct);
    }
}

#[rstest]
fn header_template_and_rename_on_output() {
    let options = SerializeOptions::new()
        .with_columns(&["name", "id"])
        .with_rename("id", "ident");
    let text = tabwire::to_string_with_options(
        &json!([{"id": 1, "name": "Ada", "extra": "x"}]),
        &options,
    )
    .unwrap();
    assert_eq!(text, "name,ident,extra\nAda,1,x\n");
}

#[rstest]
fn quote_escaping_is_idempotent_for_pathological_strings() {
    let nasty = json!([{"v": "\"\"quoted\"\",\"more\"\n'=end"}]);
    let options = ParseOptions::new().with_coerce_types(true);
    let first = tabwire::to_string(&nasty).unwrap();
    let rows = tabwire::parse_str_with_options(&first, &options).unwrap();
    let second = tabwire::to_string(&rows).unwrap();
    assert_eq!(first, second);
}
