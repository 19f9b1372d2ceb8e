/// Candidate delimiters tried during auto-detection, in priority order.
pub const DEFAULT_CANDIDATES: &[char] = &[';', ',', '\t', '|'];

/// Delimiter returned when no candidate occurs in the sample.
pub const DEFAULT_DELIMITER: char = ',';

/// Quote character recognized by the quote-aware strategies.
pub const QUOTE: char = '"';

/// Marker prefixed to values that a spreadsheet would execute as a formula.
pub const PROTECTION_MARKER: char = '\'';

/// Bytes of the sample inspected when scoring delimiter candidates.
pub const DETECT_SAMPLE_BYTES: usize = 4096;

/// Lines inspected for the field-count consistency bonus.
pub const DETECT_SAMPLE_LINES: usize = 10;

/// Complete lines that make up the structure-analysis sample. The streaming
/// path buffers until this many lines (or end of input) before compiling a
/// parser, so both paths classify the same sample.
pub const ANALYZE_SAMPLE_LINES: usize = 64;

/// Bytes hashed into a detection-cache fingerprint.
pub(crate) const FINGERPRINT_BYTES: usize = 256;

/// Default capacity for the delimiter and parser caches.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Bulk-mode row count past which a one-shot advisory suggesting the
/// streaming path is logged.
pub const STREAMING_ADVISORY_ROWS: usize = 100_000;

/// Chunk size used by `RowReader` when pulling from a reader.
pub(crate) const READ_CHUNK_BYTES: usize = 64 * 1024;

/// Characters that spreadsheet applications interpret as a formula lead-in.
#[inline]
pub fn is_formula_leader(ch: char) -> bool {
    matches!(ch, '=' | '+' | '-' | '@' | '\t' | '\r')
}

/// Bidirectional-override control characters stripped during injection
/// neutralization.
#[inline]
pub fn is_bidi_control(ch: char) -> bool {
    matches!(ch, '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}')
}

/// First character of `s` that is not a plain space.
#[inline]
pub(crate) fn first_significant(s: &str) -> Option<char> {
    s.chars().find(|&ch| ch != ' ')
}
