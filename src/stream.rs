//! Chunked streaming: reassembles logical rows across arbitrary chunk
//! boundaries without ever splitting a field value.
//!
//! [`StreamParser`] is the push half: the caller feeds chunks and receives
//! every row whose trailing boundary has arrived; the remainder (including
//! any still-open quoted span) waits for the next chunk. [`RowReader`] is
//! the pull half: an iterator over any [`Read`] that only requests more
//! bytes once the rows it already produced have been consumed.
//!
//! Parser compilation is deferred until the analysis window is buffered
//! (or the input ends), so a given input parses to the same rows no matter
//! how it was chunked.

use std::collections::VecDeque;
use std::io::Read;

use memchr::memchr_iter;
use serde_json::Value;

use crate::analyze::Strategy;
use crate::constants::{ANALYZE_SAMPLE_LINES, READ_CHUNK_BYTES};
use crate::error::Error;
use crate::options::ParseOptions;
use crate::parse::{compile_parser, strip_bom, Parser, RowAssembler};
use crate::Result;

/// Push-style streaming parser.
///
/// # Examples
/// ```
/// use tabwire::{ParseOptions, StreamParser};
///
/// let mut parser = StreamParser::new(ParseOptions::default()).unwrap();
/// let mut rows = Vec::new();
/// rows.extend(parser.feed("id,name\n1,Jo").unwrap());
/// rows.extend(parser.feed("hn\n2,Jane\n").unwrap());
/// rows.extend(parser.finish().unwrap());
/// assert_eq!(rows.len(), 2);
/// ```
#[derive(Debug)]
pub struct StreamParser {
    options: ParseOptions,
    buffer: String,
    scan_pos: usize,
    in_quotes: bool,
    newlines_buffered: usize,
    next_row_line: usize,
    parser: Option<Parser>,
    assembler: RowAssembler,
    started: bool,
}

impl StreamParser {
    pub fn new(options: ParseOptions) -> Result<Self> {
        options.validate()?;
        let assembler = RowAssembler::new(options.clone());
        Ok(Self {
            options,
            buffer: String::new(),
            scan_pos: 0,
            in_quotes: false,
            newlines_buffered: 0,
            next_row_line: 1,
            parser: None,
            assembler,
            started: false,
        })
    }

    /// Append a chunk and return every row completed by it. Rows are only
    /// produced here and in [`finish`](Self::finish); nothing is buffered
    /// downstream, so the caller controls the flow.
    pub fn feed(&mut self, chunk: &str) -> Result<Vec<Value>> {
        let chunk = if self.started { chunk } else { strip_bom(chunk) };
        self.started = true;

        self.newlines_buffered += memchr_iter(b'\n', chunk.as_bytes()).count();
        self.buffer.push_str(chunk);

        if self.parser.is_none() && self.newlines_buffered >= ANALYZE_SAMPLE_LINES {
            self.compile();
        }

        let mut out = Vec::new();
        self.drain_rows(&mut out)?;
        Ok(out)
    }

    /// Consume the parser, treating whatever remains in the buffer as the
    /// final row. An unterminated quoted span here is a terminal error.
    pub fn finish(mut self) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        if self.parser.is_none() && !self.buffer.is_empty() {
            self.compile();
        }
        self.drain_rows(&mut out)?;

        if !self.buffer.is_empty() {
            let mut tail = std::mem::take(&mut self.buffer);
            if tail.ends_with('\r') {
                tail.pop();
            }
            if !tail.is_empty() {
                self.process_row(&tail, self.next_row_line, &mut out)?;
            }
        }
        self.assembler.finish(&mut out);
        Ok(out)
    }

    fn compile(&mut self) {
        self.parser = Some(compile_parser(&self.buffer, &self.options));
    }

    fn drain_rows(&mut self, out: &mut Vec<Value>) -> Result<()> {
        while self.parser.is_some() {
            let Some(idx) = self.find_terminator() else {
                break;
            };
            let mut row: String = self.buffer.drain(..=idx).collect();
            self.scan_pos = 0;
            row.pop();
            if row.ends_with('\r') {
                row.pop();
            }

            let line = self.next_row_line;
            self.next_row_line += 1 + memchr_iter(b'\n', row.as_bytes()).count();
            self.process_row(&row, line, out)?;
        }
        Ok(())
    }

    /// Scan forward for the next line terminator outside a quoted span.
    /// Quote parity persists across chunk boundaries: a field may
    /// legitimately span several chunks.
    fn find_terminator(&mut self) -> Option<usize> {
        let quote_aware = self
            .parser
            .map(|p| p.descriptor().strategy != Strategy::Simple)
            .unwrap_or(false);
        let bytes = self.buffer.as_bytes();
        while self.scan_pos < bytes.len() {
            match bytes[self.scan_pos] {
                b'"' if quote_aware => self.in_quotes = !self.in_quotes,
                b'\n' if !self.in_quotes => return Some(self.scan_pos),
                _ => {}
            }
            self.scan_pos += 1;
        }
        None
    }

    fn process_row(&mut self, row: &str, line: usize, out: &mut Vec<Value>) -> Result<()> {
        let Some(parser) = self.parser else {
            return Ok(());
        };
        let fields = parser.split_row(row, line)?;
        self.assembler.push(crate::parse::RawRow { fields, line }, out)
    }
}

/// Pull-style row iterator over any reader.
///
/// Reads a fixed-size chunk only when every row from the previous chunk has
/// been consumed, carrying split UTF-8 sequences across reads. The sequence
/// is forward-only and ends at end of input; errors are yielded once and
/// terminate it.
///
/// # Examples
/// ```
/// use std::io::Cursor;
/// use tabwire::{ParseOptions, RowReader};
///
/// let input = Cursor::new("id,name\n1,John\n".as_bytes().to_vec());
/// let reader = RowReader::new(input, ParseOptions::default()).unwrap();
/// let rows: Result<Vec<_>, _> = reader.collect();
/// assert_eq!(rows.unwrap().len(), 1);
/// ```
#[derive(Debug)]
pub struct RowReader<R: Read> {
    reader: R,
    parser: Option<StreamParser>,
    queue: VecDeque<Value>,
    carry: Vec<u8>,
    chunk_bytes: usize,
    done: bool,
}

impl<R: Read> RowReader<R> {
    pub fn new(reader: R, options: ParseOptions) -> Result<Self> {
        Self::with_chunk_size(reader, options, READ_CHUNK_BYTES)
    }

    /// Use a custom chunk size. Mostly useful for tests and for callers
    /// with tight memory budgets.
    pub fn with_chunk_size(reader: R, options: ParseOptions, chunk_bytes: usize) -> Result<Self> {
        if chunk_bytes == 0 {
            return Err(Error::configuration("chunk size must be greater than zero"));
        }
        Ok(Self {
            reader,
            parser: Some(StreamParser::new(options)?),
            queue: VecDeque::new(),
            carry: Vec::new(),
            chunk_bytes,
            done: false,
        })
    }

    fn pump(&mut self) -> Result<()> {
        let mut buf = vec![0u8; self.chunk_bytes];
        loop {
            if !self.queue.is_empty() || self.done {
                return Ok(());
            }
            let read = self.reader.read(&mut buf)?;
            if read == 0 {
                self.done = true;
                if !self.carry.is_empty() {
                    return Err(Error::validation("input ends mid utf-8 sequence"));
                }
                if let Some(parser) = self.parser.take() {
                    self.queue.extend(parser.finish()?);
                }
                return Ok(());
            }

            self.carry.extend_from_slice(&buf[..read]);
            let chunk = match std::str::from_utf8(&self.carry) {
                Ok(text) => text,
                Err(err) if err.error_len().is_none() => {
                    // Clean split inside a multi-byte sequence; hold the
                    // incomplete suffix for the next read.
                    let valid = err.valid_up_to();
                    std::str::from_utf8(&self.carry[..valid])
                        .map_err(|e| Error::validation(format!("invalid utf-8: {e}")))?
                }
                Err(err) => {
                    return Err(Error::validation(format!("invalid utf-8: {err}")));
                }
            };

            if let Some(parser) = self.parser.as_mut() {
                let rows = parser.feed(chunk)?;
                let consumed = chunk.len();
                self.carry.drain(..consumed);
                self.queue.extend(rows);
            }
        }
    }
}

impl<R: Read> Iterator for RowReader<R> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(row) = self.queue.pop_front() {
            return Some(Ok(row));
        }
        if self.done {
            return None;
        }
        if let Err(err) = self.pump() {
            self.done = true;
            return Some(Err(err));
        }
        self.queue.pop_front().map(Ok)
    }
}
