//! Structural analysis of an input sample.
//!
//! The analyzer inspects a bounded prefix and classifies the input so the
//! cheapest capable parsing strategy can be compiled. The classification is
//! a heuristic: quoting complexity that only appears past the sample still
//! has to be survivable downstream, which is why the pipeline carries
//! row-shift repair for the fast path.

use memchr::memchr_iter;
use serde::Serialize;

use crate::constants::{ANALYZE_SAMPLE_LINES, QUOTE};

/// Parsing strategy selected for a classified input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    /// Plain splitting, no quote handling.
    Simple,
    /// Single-pass state machine, quotes respected.
    QuoteAware,
    /// Logical-line reassembly, tolerates embedded newlines.
    Standard,
}

/// Classification of an input sample, derived once per distinct signature
/// and immutable afterwards. The serialized form doubles as the
/// compiled-parser cache key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StructureDescriptor {
    pub delimiter: char,
    pub has_quotes: bool,
    pub has_escaped_quotes: bool,
    pub has_newlines_in_fields: bool,
    pub field_consistency: bool,
    pub strategy: Strategy,
}

impl StructureDescriptor {
    pub(crate) fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Prefix of `text` covering its first [`ANALYZE_SAMPLE_LINES`] complete
/// lines (or the whole text when shorter). Both the bulk and the streaming
/// path classify exactly this window, which keeps their descriptors equal
/// for the same input.
pub(crate) fn analysis_sample(text: &str) -> &str {
    let bytes = text.as_bytes();
    match memchr_iter(b'\n', bytes).nth(ANALYZE_SAMPLE_LINES - 1) {
        Some(end) => &text[..=end],
        None => text,
    }
}

/// Inspect a sample and classify it.
///
/// Selection rule: no quotes and no embedded newlines is `Simple`; quotes
/// without embedded newlines is `QuoteAware`; embedded newlines or an
/// inconsistent field count falls back to `Standard`.
///
/// # Examples
/// ```
/// use tabwire::{analyze, Strategy};
///
/// let descriptor = analyze("a,b\n1,2", ',');
/// assert_eq!(descriptor.strategy, Strategy::Simple);
///
/// let descriptor = analyze("a,b\n\"x\",2", ',');
/// assert_eq!(descriptor.strategy, Strategy::QuoteAware);
/// ```
pub fn analyze(sample: &str, delimiter: char) -> StructureDescriptor {
    let sample = analysis_sample(sample);

    let mut has_quotes = false;
    let mut has_escaped_quotes = false;
    let mut has_newlines_in_fields = false;
    let mut field_count: Option<usize> = None;
    let mut field_consistency = true;

    for line in sample.lines().take(ANALYZE_SAMPLE_LINES) {
        if line.is_empty() {
            continue;
        }
        let quotes = memchr_iter(QUOTE as u8, line.as_bytes()).count();
        if quotes > 0 {
            has_quotes = true;
            if line.contains("\"\"") {
                has_escaped_quotes = true;
            }
            // Odd parity means a quoted span continues past the physical
            // line, i.e. the field contains a raw newline.
            if quotes % 2 == 1 {
                has_newlines_in_fields = true;
            }
        }
        let count = line.matches(delimiter).count() + 1;
        match field_count {
            None => field_count = Some(count),
            Some(expected) if expected != count => field_consistency = false,
            Some(_) => {}
        }
    }

    let strategy = if has_newlines_in_fields || !field_consistency {
        Strategy::Standard
    } else if has_quotes {
        Strategy::QuoteAware
    } else {
        Strategy::Simple
    };

    StructureDescriptor {
        delimiter,
        has_quotes,
        has_escaped_quotes,
        has_newlines_in_fields,
        field_consistency,
        strategy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_plain_input_is_simple() {
        let descriptor = analyze("id,name\n1,John\n2,Jane", ',');
        assert!(!descriptor.has_quotes);
        assert!(!descriptor.has_newlines_in_fields);
        assert!(descriptor.field_consistency);
        assert_eq!(descriptor.strategy, Strategy::Simple);
    }

    #[rstest::rstest]
    fn test_quotes_without_newlines_is_quote_aware() {
        let descriptor = analyze("id,name\n1,\"John, Jr.\"\n2,Jane", ',');
        assert!(descriptor.has_quotes);
        assert!(!descriptor.has_newlines_in_fields);
        assert_eq!(descriptor.strategy, Strategy::QuoteAware);
    }

    #[rstest::rstest]
    fn test_escaped_quotes_are_flagged() {
        let descriptor = analyze("id,note\n1,\"say \"\"hi\"\"\"", ',');
        assert!(descriptor.has_escaped_quotes);
        assert_eq!(descriptor.strategy, Strategy::QuoteAware);
    }

    #[rstest::rstest]
    fn test_embedded_newline_falls_back_to_standard() {
        let descriptor = analyze("id,note\n1,\"line1\nline2\"", ',');
        assert!(descriptor.has_newlines_in_fields);
        assert_eq!(descriptor.strategy, Strategy::Standard);
    }

    #[rstest::rstest]
    fn test_inconsistent_fields_fall_back_to_standard() {
        let descriptor = analyze("a,b,c\n1,2\n3,4,5", ',');
        assert!(!descriptor.field_consistency);
        assert_eq!(descriptor.strategy, Strategy::Standard);
    }

    #[rstest::rstest]
    fn test_blank_lines_are_ignored() {
        let descriptor = analyze("a,b\n\n1,2", ',');
        assert!(descriptor.field_consistency);
        assert_eq!(descriptor.strategy, Strategy::Simple);
    }

    #[rstest::rstest]
    fn test_sample_is_bounded() {
        // Quoting past the sample window must not affect classification.
        let mut input = String::new();
        for i in 0..ANALYZE_SAMPLE_LINES {
            input.push_str(&format!("{i},{i}\n"));
        }
        input.push_str("\"a\nb\",c\n");
        let descriptor = analyze(&input, ',');
        assert_eq!(descriptor.strategy, Strategy::Simple);
    }

    #[rstest::rstest]
    fn test_cache_key_is_stable() {
        let a = analyze("a,b\n1,2", ',');
        let b = analyze("a,b\n1,2", ',');
        assert_eq!(a.cache_key(), b.cache_key());
        let c = analyze("a;b\n1;2", ';');
        assert_ne!(a.cache_key(), c.cache_key());
    }
}
