//! Fast path for inputs without quoting: plain line and delimiter splits.

use memchr::memchr_iter;

use crate::parse::{FieldBuf, RawField, RawRow};
use crate::Result;

pub(crate) fn parse<F>(text: &str, delimiter: char, mut emit: F) -> Result<()>
where
    F: FnMut(RawRow) -> Result<()>,
{
    let bytes = text.as_bytes();
    let mut start = 0usize;
    let mut line = 1usize;
    for idx in memchr_iter(b'\n', bytes) {
        let mut end = idx;
        if end > start && bytes[end - 1] == b'\r' {
            end -= 1;
        }
        emit(RawRow {
            fields: split_fields(&text[start..end], delimiter),
            line,
        })?;
        start = idx + 1;
        line += 1;
    }

    if start < bytes.len() {
        let mut end = bytes.len();
        if bytes[end - 1] == b'\r' {
            end -= 1;
        }
        emit(RawRow {
            fields: split_fields(&text[start..end], delimiter),
            line,
        })?;
    }
    Ok(())
}

pub(crate) fn split_fields(row: &str, delimiter: char) -> FieldBuf {
    row.split(delimiter)
        .map(|field| RawField {
            text: field.to_string(),
            quoted: false,
        })
        .collect()
}
