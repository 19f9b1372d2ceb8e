//! Quote-aware parsing: a single-pass, two-state machine.
//!
//! While unquoted, the delimiter ends a field and a line terminator ends a
//! row. A quote flips the machine into the quoted state, where both are
//! plain content; a doubled quote inside the quoted state is an escaped
//! literal quote. Reaching end of input while still quoted is a parse
//! error carrying the line the open quote started on.

use crate::error::Error;
use crate::parse::{FieldBuf, RawField, RawRow};
use crate::Result;

pub(crate) fn parse<F>(text: &str, delimiter: char, mut emit: F) -> Result<()>
where
    F: FnMut(RawRow) -> Result<()>,
{
    // A bare carriage return at end of input is terminator debris, the
    // same as the `\r` of a final unterminated `\r\n`.
    let text = text.strip_suffix('\r').unwrap_or(text);
    let mut machine = Machine::new(delimiter);
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if machine.in_quotes && ch == '"' && chars.peek() == Some(&'"') {
            chars.next();
            machine.field.push('"');
            continue;
        }
        if let Some(row) = machine.step(ch) {
            emit(row)?;
        }
    }
    machine.finish(&mut emit)
}

/// Split one logical row (terminators already consumed, embedded newlines
/// allowed inside quotes) into fields. `line` is the row's starting
/// physical line, used for error context.
pub(crate) fn split_fields(row: &str, delimiter: char, line: usize) -> Result<FieldBuf> {
    let mut machine = Machine::new(delimiter);
    machine.line = line;
    machine.row_line = line;
    let mut chars = row.chars().peekable();
    while let Some(ch) = chars.next() {
        if machine.in_quotes && ch == '"' && chars.peek() == Some(&'"') {
            chars.next();
            machine.field.push('"');
            continue;
        }
        if ch == '\n' && !machine.in_quotes {
            // Callers hand over single logical rows; an unquoted newline
            // here would be a terminator they failed to strip.
            machine.end_field();
            continue;
        }
        machine.step_field(ch);
    }
    if machine.in_quotes {
        return Err(Error::parsing(machine.open_quote_line, "unclosed quote"));
    }
    machine.end_field();
    Ok(machine.fields)
}

struct Machine {
    delimiter: char,
    in_quotes: bool,
    field: String,
    field_quoted: bool,
    fields: FieldBuf,
    line: usize,
    row_line: usize,
    open_quote_line: usize,
}

impl Machine {
    fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            in_quotes: false,
            field: String::new(),
            field_quoted: false,
            fields: FieldBuf::new(),
            line: 1,
            row_line: 1,
            open_quote_line: 1,
        }
    }

    /// Advance by one character; returns a completed row on an unquoted
    /// line terminator.
    fn step(&mut self, ch: char) -> Option<RawRow> {
        if !self.in_quotes && ch == '\n' {
            if self.field.ends_with('\r') {
                self.field.pop();
            }
            self.end_field();
            let row = RawRow {
                fields: std::mem::take(&mut self.fields),
                line: self.row_line,
            };
            self.line += 1;
            self.row_line = self.line;
            return Some(row);
        }
        if ch == '\n' {
            self.line += 1;
        }
        self.step_field(ch);
        None
    }

    /// Field-level transitions only; terminators are the caller's concern.
    fn step_field(&mut self, ch: char) {
        if self.in_quotes {
            if ch == '"' {
                self.in_quotes = false;
            } else {
                self.field.push(ch);
            }
        } else if ch == '"' {
            self.in_quotes = true;
            self.field_quoted = true;
            self.open_quote_line = self.line;
        } else if ch == self.delimiter {
            self.end_field();
        } else {
            self.field.push(ch);
        }
    }

    fn end_field(&mut self) {
        self.fields.push(RawField {
            text: std::mem::take(&mut self.field),
            quoted: self.field_quoted,
        });
        self.field_quoted = false;
    }

    fn finish<F>(mut self, emit: &mut F) -> Result<()>
    where
        F: FnMut(RawRow) -> Result<()>,
    {
        if self.in_quotes {
            return Err(Error::parsing(self.open_quote_line, "unclosed quote"));
        }
        if !self.field.is_empty() || self.field_quoted || !self.fields.is_empty() {
            self.end_field();
            emit(RawRow {
                fields: self.fields,
                line: self.row_line,
            })?;
        }
        Ok(())
    }
}
