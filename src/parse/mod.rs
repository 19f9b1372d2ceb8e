//! Strategy compilation, the compiled-parser cache, and the row pipeline
//! shared by the bulk and streaming paths.

pub(crate) mod quoted;
pub(crate) mod simple;
pub(crate) mod standard;

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use lru::LruCache;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::analyze::{analysis_sample, analyze, Strategy, StructureDescriptor};
use crate::constants::{DEFAULT_CACHE_CAPACITY, STREAMING_ADVISORY_ROWS};
use crate::detect::detect_delimiter;
use crate::error::Error;
use crate::normalize::normalize_field;
use crate::options::{ErrorMode, OutputMode, ParseOptions};
use crate::repair::maybe_merge;
use crate::Result;

/// One field as produced by a row parser, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawField {
    pub text: String,
    pub quoted: bool,
}

pub(crate) type FieldBuf = SmallVec<[RawField; 8]>;

/// A parsed but not yet normalized row. `line` is the 1-based physical
/// line the row started on.
#[derive(Debug, Clone)]
pub(crate) struct RawRow {
    pub fields: FieldBuf,
    pub line: usize,
}

/// A compiled row producer. The strategy dispatch is fixed when the
/// descriptor is derived and never changes afterwards.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Parser {
    descriptor: StructureDescriptor,
}

impl Parser {
    pub(crate) fn new(descriptor: StructureDescriptor) -> Self {
        Self { descriptor }
    }

    pub(crate) fn descriptor(&self) -> &StructureDescriptor {
        &self.descriptor
    }

    /// Run the compiled strategy over `text`, calling back once per raw row.
    pub(crate) fn parse<F>(&self, text: &str, emit: F) -> Result<()>
    where
        F: FnMut(RawRow) -> Result<()>,
    {
        match self.descriptor.strategy {
            Strategy::Simple => simple::parse(text, self.descriptor.delimiter, emit),
            Strategy::QuoteAware => quoted::parse(text, self.descriptor.delimiter, emit),
            Strategy::Standard => standard::parse(text, self.descriptor.delimiter, emit),
        }
    }

    /// Split one logical row that the streaming reassembler has already
    /// isolated.
    pub(crate) fn split_row(&self, row: &str, line: usize) -> Result<FieldBuf> {
        match self.descriptor.strategy {
            Strategy::Simple => Ok(simple::split_fields(row, self.descriptor.delimiter)),
            Strategy::QuoteAware | Strategy::Standard => {
                quoted::split_fields(row, self.descriptor.delimiter, line)
            }
        }
    }
}

/// Shared, bounded memo of compiled parsers, keyed by the descriptor's
/// serialized form. Like the delimiter cache, it is constructor-injected
/// wherever isolation matters.
///
/// # Examples
/// ```
/// use tabwire::ParserCache;
///
/// let cache = ParserCache::new(16);
/// assert!(cache.is_empty());
/// ```
pub struct ParserCache {
    inner: Mutex<LruCache<String, Parser>>,
}

impl ParserCache {
    /// Create a cache holding at most `capacity` compiled parsers.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub(crate) fn compile(&self, descriptor: &StructureDescriptor) -> Parser {
        let key = descriptor.cache_key();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parser) = inner.get(&key) {
            return *parser;
        }
        let parser = Parser::new(*descriptor);
        inner.put(key, parser);
        parser
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ParserCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl fmt::Debug for ParserCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserCache")
            .field("len", &self.len())
            .finish()
    }
}

pub(crate) fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{FEFF}').unwrap_or(text)
}

/// Pick the delimiter for `sample`: the fixed option when set, otherwise
/// auto-detection through the injected cache (or uncached).
pub(crate) fn resolve_delimiter(sample: &str, options: &ParseOptions) -> char {
    if let Some(delimiter) = options.delimiter {
        return delimiter;
    }
    match &options.delimiter_cache {
        Some(cache) => cache.detect(sample, &options.candidates),
        None => detect_delimiter(sample, &options.candidates),
    }
}

/// Detect, analyze and compile in one step. Detection and analysis both see
/// the same bounded sample, which is what keeps bulk and streaming
/// classifications identical for identical input.
pub(crate) fn compile_parser(text: &str, options: &ParseOptions) -> Parser {
    let sample = analysis_sample(text);
    let delimiter = resolve_delimiter(sample, options);
    let descriptor = analyze(sample, delimiter);
    match &options.parser_cache {
        Some(cache) => cache.compile(&descriptor),
        None => Parser::new(descriptor),
    }
}

/// Turns raw rows into emitted values: captures headers, reconciles row
/// width, runs row-shift repair with one row of lookahead, and normalizes
/// fields. Both the bulk and the streaming path feed this one assembler,
/// so their outputs cannot drift apart.
#[derive(Debug)]
pub(crate) struct RowAssembler {
    options: ParseOptions,
    headers: Option<Vec<SmolStr>>,
    pending: Option<RawRow>,
}

impl RowAssembler {
    pub(crate) fn new(options: ParseOptions) -> Self {
        Self {
            options,
            headers: None,
            pending: None,
        }
    }

    pub(crate) fn push(&mut self, mut row: RawRow, out: &mut Vec<Value>) -> Result<()> {
        if row
            .fields
            .iter()
            .all(|field| field.text.is_empty() && !field.quoted)
        {
            return Ok(());
        }

        if self.headers.is_none() {
            if self.options.has_headers {
                self.headers = Some(self.header_names(&row));
                return Ok(());
            }
            if self.options.output == OutputMode::Objects {
                self.headers = Some(self.synthesized_names(row.fields.len()));
            }
            // Compact mode without headers has no width to reconcile to.
        }

        if let Some(expected) = self.headers.as_ref().map(Vec::len) {
            if row.fields.len() != expected {
                if self.options.strict {
                    return self.route(Error::field_count(row.line, expected, row.fields.len()));
                }
                if row.fields.len() > expected {
                    tracing::debug!(
                        line = row.line,
                        expected,
                        actual = row.fields.len(),
                        "truncating extra fields"
                    );
                    row.fields.truncate(expected);
                } else {
                    row.fields.resize(expected, RawField::default());
                }
            }
        }

        if self.options.output == OutputMode::Objects && self.options.repair_row_shifts {
            if let Some(mut held) = self.pending.take() {
                if maybe_merge(&mut held, &row) {
                    self.pending = Some(held);
                    return Ok(());
                }
                self.finalize(held, out);
            }
            self.pending = Some(row);
            return Ok(());
        }

        self.finalize(row, out);
        Ok(())
    }

    /// Flush the lookahead row at end of input.
    pub(crate) fn finish(&mut self, out: &mut Vec<Value>) {
        if let Some(held) = self.pending.take() {
            self.finalize(held, out);
        }
    }

    fn finalize(&self, row: RawRow, out: &mut Vec<Value>) {
        match self.options.output {
            OutputMode::Objects => {
                let Some(headers) = &self.headers else {
                    return;
                };
                let mut map = Map::new();
                for (header, field) in headers.iter().zip(row.fields.iter()) {
                    map.insert(header.to_string(), normalize_field(field, &self.options));
                }
                out.push(Value::Object(map));
            }
            OutputMode::Compact => {
                out.push(Value::Array(
                    row.fields
                        .iter()
                        .map(|field| normalize_field(field, &self.options))
                        .collect(),
                ));
            }
        }
    }

    fn route(&self, err: Error) -> Result<()> {
        match self.options.on_error {
            ErrorMode::Throw => Err(err),
            ErrorMode::Warn => {
                tracing::warn!(error = %err, "skipping row");
                Ok(())
            }
            ErrorMode::Skip => Ok(()),
        }
    }

    fn header_names(&self, row: &RawRow) -> Vec<SmolStr> {
        row.fields
            .iter()
            .map(|field| {
                let name = if self.options.trim {
                    field.text.trim()
                } else {
                    field.text.as_str()
                };
                SmolStr::new(self.renamed(name))
            })
            .collect()
    }

    fn synthesized_names(&self, count: usize) -> Vec<SmolStr> {
        (1..=count)
            .map(|idx| SmolStr::new(self.renamed(&format!("column_{idx}"))))
            .collect()
    }

    fn renamed<'a>(&'a self, name: &'a str) -> &'a str {
        self.options
            .rename
            .iter()
            .find(|(from, _)| from == name)
            .map(|(_, to)| to.as_str())
            .unwrap_or(name)
    }
}

/// Bulk entry point: the whole pipeline over one in-memory buffer.
pub(crate) fn parse_to_rows(input: &str, options: &ParseOptions) -> Result<Vec<Value>> {
    options.validate()?;
    let text = strip_bom(input);
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let parser = compile_parser(text, options);
    let mut assembler = RowAssembler::new(options.clone());
    let mut out = Vec::new();
    let mut advised = false;

    parser.parse(text, |row| {
        assembler.push(row, &mut out)?;
        enforce_limit(&out, options)?;
        if !advised && out.len() >= STREAMING_ADVISORY_ROWS {
            advised = true;
            tracing::warn!(
                rows = out.len(),
                "large bulk parse; consider the streaming API"
            );
        }
        Ok(())
    })?;
    assembler.finish(&mut out);
    enforce_limit(&out, options)?;
    Ok(out)
}

fn enforce_limit(out: &[Value], options: &ParseOptions) -> Result<()> {
    match options.max_rows {
        Some(limit) if out.len() > limit => Err(Error::limit(limit, out.len())),
        _ => Ok(()),
    }
}
