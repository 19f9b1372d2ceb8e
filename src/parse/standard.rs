//! Fallback strategy: logical lines are reassembled by tracking quote
//! parity across physical lines, then handed to the quote-aware field
//! splitter. Handles embedded newlines and ragged inputs.

use memchr::memchr_iter;

use crate::parse::{quoted, RawRow};
use crate::Result;

pub(crate) fn parse<F>(text: &str, delimiter: char, mut emit: F) -> Result<()>
where
    F: FnMut(RawRow) -> Result<()>,
{
    let bytes = text.as_bytes();
    let mut logical_start = 0usize;
    let mut phys_start = 0usize;
    let mut logical_line = 1usize;
    let mut line = 1usize;
    let mut in_quotes = false;

    for idx in memchr_iter(b'\n', bytes) {
        let quotes = memchr_iter(b'"', &bytes[phys_start..idx]).count();
        phys_start = idx + 1;
        if quotes % 2 == 1 {
            in_quotes = !in_quotes;
        }
        if !in_quotes {
            let mut end = idx;
            if end > logical_start && bytes[end - 1] == b'\r' {
                end -= 1;
            }
            emit(RawRow {
                fields: quoted::split_fields(&text[logical_start..end], delimiter, logical_line)?,
                line: logical_line,
            })?;
            logical_start = idx + 1;
            logical_line = line + 1;
        }
        line += 1;
    }

    if logical_start < bytes.len() {
        let mut end = bytes.len();
        if bytes[end - 1] == b'\r' {
            end -= 1;
        }
        emit(RawRow {
            fields: quoted::split_fields(&text[logical_start..end], delimiter, logical_line)?,
            line: logical_line,
        })?;
    }
    Ok(())
}
