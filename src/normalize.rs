//! Per-field value normalization and formula-injection neutralization.
//!
//! Parse direction: trim, strip one protection marker, then (when enabled)
//! coerce numeric and boolean literals. Unquoted empty fields become null.
//! Serialize direction: strip bidirectional-override controls and prefix a
//! protection marker when the first significant character would be
//! interpreted as a formula by spreadsheet software.

use std::borrow::Cow;

use serde_json::{Number, Value};

use crate::constants::{first_significant, is_bidi_control, is_formula_leader, PROTECTION_MARKER};
use crate::options::ParseOptions;
use crate::parse::RawField;

pub(crate) fn normalize_field(field: &RawField, options: &ParseOptions) -> Value {
    let mut text: &str = &field.text;
    if options.trim {
        text = text.trim();
    }

    // Strip one protection layer so a value that round-trips through the
    // library twice does not accumulate markers.
    if let Some(rest) = text.strip_prefix(PROTECTION_MARKER) {
        if first_significant(rest).is_some_and(is_formula_leader) {
            text = rest;
        }
    }

    if text.is_empty() {
        if options.empty_as_null && !field.quoted {
            return Value::Null;
        }
        return Value::String(String::new());
    }

    if options.coerce_types && !field.quoted {
        if let Some(value) = coerce_scalar(text) {
            return value;
        }
    }

    Value::String(text.to_string())
}

/// Lexical coercion: integer, then decimal, then boolean literal. Anything
/// else stays text. Matching is done on the whitespace-trimmed value;
/// leading-zero integers like `05` are preserved as text.
fn coerce_scalar(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if is_integer_literal(trimmed) {
        if let Ok(n) = trimmed.parse::<i64>() {
            return Some(Value::Number(Number::from(n)));
        }
        return None;
    }
    if is_decimal_literal(trimmed) {
        if let Ok(f) = trimmed.parse::<f64>() {
            if let Some(n) = Number::from_f64(f) {
                return Some(Value::Number(n));
            }
        }
        return None;
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Some(Value::Bool(true));
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Some(Value::Bool(false));
    }
    None
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    !(digits.len() > 1 && digits.starts_with('0'))
}

fn is_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut idx = 0;

    if bytes.first() == Some(&b'-') {
        idx += 1;
    }

    let int_start = idx;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    let int_len = idx - int_start;
    if int_len == 0 {
        return false;
    }
    if int_len > 1 && bytes[int_start] == b'0' {
        return false;
    }

    let mut fractional = false;
    if idx < bytes.len() && bytes[idx] == b'.' {
        idx += 1;
        let frac_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_digit() {
            idx += 1;
        }
        if idx == frac_start {
            return false;
        }
        fractional = true;
    }

    let mut exponent = false;
    if idx < bytes.len() && (bytes[idx] == b'e' || bytes[idx] == b'E') {
        idx += 1;
        if idx < bytes.len() && (bytes[idx] == b'+' || bytes[idx] == b'-') {
            idx += 1;
        }
        let exp_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_digit() {
            idx += 1;
        }
        if idx == exp_start {
            return false;
        }
        exponent = true;
    }

    idx == bytes.len() && (fractional || exponent)
}

/// Defuse a value before it is written to delimited output: remove
/// bidirectional-override controls, then prefix the protection marker when
/// the first significant character is a formula lead-in.
pub(crate) fn neutralize(text: &str) -> Cow<'_, str> {
    let stripped: Cow<'_, str> = if text.chars().any(is_bidi_control) {
        Cow::Owned(text.chars().filter(|&ch| !is_bidi_control(ch)).collect())
    } else {
        Cow::Borrowed(text)
    };

    if first_significant(&stripped).is_some_and(is_formula_leader) {
        let mut owned = String::with_capacity(stripped.len() + 1);
        owned.push(PROTECTION_MARKER);
        owned.push_str(&stripped);
        Cow::Owned(owned)
    } else {
        stripped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unquoted(text: &str) -> RawField {
        RawField {
            text: text.to_string(),
            quoted: false,
        }
    }

    fn quoted(text: &str) -> RawField {
        RawField {
            text: text.to_string(),
            quoted: true,
        }
    }

    fn coercing() -> ParseOptions {
        ParseOptions::new().with_coerce_types(true)
    }

    #[rstest::rstest]
    fn test_values_stay_strings_without_coercion() {
        let opts = ParseOptions::default();
        assert_eq!(normalize_field(&unquoted("42"), &opts), Value::from("42"));
        assert_eq!(
            normalize_field(&unquoted("true"), &opts),
            Value::from("true")
        );
    }

    #[rstest::rstest]
    fn test_numeric_coercion() {
        let opts = coercing();
        assert_eq!(normalize_field(&unquoted("42"), &opts), Value::from(42));
        assert_eq!(normalize_field(&unquoted("-7"), &opts), Value::from(-7));
        assert_eq!(normalize_field(&unquoted("1.5"), &opts), Value::from(1.5));
        assert_eq!(
            normalize_field(&unquoted("2e3"), &opts),
            Value::from(2000.0)
        );
        assert_eq!(normalize_field(&unquoted(" 5 "), &opts), Value::from(5));
    }

    #[rstest::rstest]
    #[case("05")]
    #[case("-012")]
    #[case("1x")]
    #[case("1.")]
    #[case(".5")]
    #[case("+5")]
    #[case("1e")]
    fn test_non_literals_stay_text(#[case] input: &str) {
        let opts = coercing();
        assert_eq!(
            normalize_field(&unquoted(input), &opts),
            Value::from(input)
        );
    }

    #[rstest::rstest]
    fn test_boolean_coercion_is_literal_only() {
        let opts = coercing();
        assert_eq!(
            normalize_field(&unquoted("TRUE"), &opts),
            Value::from(true)
        );
        assert_eq!(
            normalize_field(&unquoted("False"), &opts),
            Value::from(false)
        );
        assert_eq!(
            normalize_field(&unquoted("yes"), &opts),
            Value::from("yes")
        );
        assert_eq!(normalize_field(&unquoted("1"), &opts), Value::from(1));
    }

    #[rstest::rstest]
    fn test_quoted_fields_are_never_coerced() {
        let opts = coercing();
        assert_eq!(normalize_field(&quoted("42"), &opts), Value::from("42"));
        assert_eq!(
            normalize_field(&quoted("true"), &opts),
            Value::from("true")
        );
    }

    #[rstest::rstest]
    fn test_empty_handling() {
        let opts = ParseOptions::default();
        assert_eq!(normalize_field(&unquoted(""), &opts), Value::Null);
        assert_eq!(normalize_field(&quoted(""), &opts), Value::from(""));

        let opts = ParseOptions::new().with_empty_as_null(false);
        assert_eq!(normalize_field(&unquoted(""), &opts), Value::from(""));
    }

    #[rstest::rstest]
    fn test_trim_option() {
        let opts = ParseOptions::new().with_trim(true);
        assert_eq!(
            normalize_field(&unquoted("  x  "), &opts),
            Value::from("x")
        );
        let opts = ParseOptions::default();
        assert_eq!(
            normalize_field(&unquoted("  x  "), &opts),
            Value::from("  x  ")
        );
    }

    #[rstest::rstest]
    fn test_protection_marker_is_stripped_once() {
        let opts = ParseOptions::default();
        assert_eq!(
            normalize_field(&unquoted("'=SUM(A1)"), &opts),
            Value::from("=SUM(A1)")
        );
        // Only a marker that directly guards a risky character is stripped.
        assert_eq!(
            normalize_field(&unquoted("''=SUM(A1)"), &opts),
            Value::from("''=SUM(A1)")
        );
        // A marker guarding nothing risky is plain data.
        assert_eq!(
            normalize_field(&unquoted("'hello"), &opts),
            Value::from("'hello")
        );
    }

    #[rstest::rstest]
    #[case("=SUM(A1)", "'=SUM(A1)")]
    #[case("+1", "'+1")]
    #[case("-1", "'-1")]
    #[case("@cmd", "'@cmd")]
    #[case("\tx", "'\tx")]
    #[case("\rx", "'\rx")]
    #[case("  =x", "'  =x")]
    fn test_neutralize_prefixes_risky_values(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(neutralize(input), expected);
    }

    #[rstest::rstest]
    #[case("hello")]
    #[case("1x")]
    #[case("")]
    #[case("'=already")]
    fn test_neutralize_leaves_safe_values(#[case] input: &str) {
        assert_eq!(neutralize(input), input);
    }

    #[rstest::rstest]
    fn test_neutralize_strips_bidi_controls() {
        let input = "abc\u{202E}def";
        assert_eq!(neutralize(input), "abcdef");
        let input = "\u{2066}=x";
        assert_eq!(neutralize(input), "'=x");
    }
}
