//! Row-shift repair: a best-effort pass that rejoins a record the fast
//! path split in two because a quoted field contained a raw newline.
//!
//! The mis-split leaves a telltale shape: the first row's last populated
//! column holds a truncated, still-quoted value, and the next row starts
//! with the continuation followed by the values that belong in the
//! remaining columns, its own tail empty. The pass runs with one row of
//! lookahead and can both under-merge and, on adversarial data, over-merge
//! two unrelated rows that happen to match the shape.

use crate::parse::{RawField, RawRow};

/// Try to merge `next` into `current`. Returns `true` when `next` was a
/// continuation and has been absorbed; the caller drops it.
pub(crate) fn maybe_merge(current: &mut RawRow, next: &RawRow) -> bool {
    let Some(open_idx) = last_non_empty(&current.fields) else {
        return false;
    };
    if !current.fields[open_idx].text.contains('"') {
        return false;
    }

    let Some(lead_len) = leading_prefix_len(&next.fields) else {
        return false;
    };
    // A full-width continuation row is indistinguishable from real data.
    if lead_len == next.fields.len() {
        return false;
    }

    let target = &mut current.fields[open_idx];
    target.text.push('\n');
    target.text.push_str(&next.fields[0].text);
    if let Some(unwrapped) = unwrap_quotes(&target.text) {
        target.text = unwrapped;
        target.quoted = true;
    }

    for offset in 1..lead_len {
        let slot = open_idx + offset;
        if slot < current.fields.len() {
            current.fields[slot] = next.fields[offset].clone();
        }
    }
    true
}

fn last_non_empty(fields: &[RawField]) -> Option<usize> {
    fields.iter().rposition(|field| !field.text.is_empty())
}

/// Length of the non-empty leading prefix, provided every non-empty field
/// is part of it (the trailing columns must all be empty).
fn leading_prefix_len(fields: &[RawField]) -> Option<usize> {
    let last = last_non_empty(fields)?;
    if fields[..=last].iter().all(|field| !field.text.is_empty()) {
        Some(last + 1)
    } else {
        None
    }
}

/// Unwrap one balanced pair of surrounding quotes and collapse doubled
/// quotes, restoring the value the quote-aware parser would have produced.
fn unwrap_quotes(text: &str) -> Option<String> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    Some(inner.replace("\"\"", "\""))
}
