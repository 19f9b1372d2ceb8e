use std::sync::Arc;

use crate::constants::{DEFAULT_CANDIDATES, QUOTE};
use crate::detect::DelimiterCache;
use crate::error::Error;
use crate::parse::ParserCache;
use crate::Result;

/// Shape of the rows produced by a parse.
///
/// # Examples
/// ```
/// use tabwire::OutputMode;
///
/// let mode = OutputMode::Compact;
/// let _ = mode;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Field-name-keyed records, keys in header order.
    #[default]
    Objects,
    /// Arrays of values, no field names.
    Compact,
}

/// How per-row failures are handled once a header row exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Skip the offending row silently.
    Skip,
    /// Log the failure and skip the row.
    Warn,
    /// Abort the whole operation.
    #[default]
    Throw,
}

/// Row terminator written by the serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    /// Strict RFC 4180 output.
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Options for parsing delimited text into rows.
///
/// # Examples
/// ```
/// use tabwire::{OutputMode, ParseOptions};
///
/// let opts = ParseOptions::new()
///     .with_delimiter(';')
///     .with_output(OutputMode::Compact);
/// let _ = opts;
/// ```
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Fixed delimiter; `None` means auto-detect.
    pub delimiter: Option<char>,
    pub auto_detect: bool,
    /// Candidates scored during auto-detection, in priority order.
    pub candidates: Vec<char>,
    /// Treat the first row as column names.
    pub has_headers: bool,
    /// Header renames, applied to derived names (`from`, `to`).
    pub rename: Vec<(String, String)>,
    pub output: OutputMode,
    /// Bulk-mode row ceiling; `None` is unbounded.
    pub max_rows: Option<usize>,
    pub on_error: ErrorMode,
    /// Merge rows that were mis-split across a quoted line break.
    pub repair_row_shifts: bool,
    /// Trim surrounding whitespace from field values and header names.
    pub trim: bool,
    /// Coerce numeric and boolean literals to typed values.
    pub coerce_types: bool,
    /// Turn unquoted empty fields into null instead of an empty string.
    pub empty_as_null: bool,
    /// Reject rows whose width differs from the header width.
    pub strict: bool,
    /// Shared detection cache; a fresh one is used per call when absent.
    pub delimiter_cache: Option<Arc<DelimiterCache>>,
    /// Shared compiled-parser cache.
    pub parser_cache: Option<Arc<ParserCache>>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            auto_detect: true,
            candidates: DEFAULT_CANDIDATES.to_vec(),
            has_headers: true,
            rename: Vec::new(),
            output: OutputMode::Objects,
            max_rows: None,
            on_error: ErrorMode::Throw,
            repair_row_shifts: true,
            trim: false,
            coerce_types: false,
            empty_as_null: true,
            strict: false,
            delimiter_cache: None,
            parser_cache: None,
        }
    }
}

impl ParseOptions {
    /// Create new parse options with defaults (auto-detection enabled).
    ///
    /// # Examples
    /// ```
    /// use tabwire::ParseOptions;
    ///
    /// let opts = ParseOptions::new();
    /// assert!(opts.auto_detect);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the delimiter instead of auto-detecting it.
    ///
    /// # Examples
    /// ```
    /// use tabwire::ParseOptions;
    ///
    /// let opts = ParseOptions::new().with_delimiter('\t');
    /// assert_eq!(opts.delimiter, Some('\t'));
    /// ```
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Enable or disable delimiter auto-detection.
    pub fn with_auto_detect(mut self, auto_detect: bool) -> Self {
        self.auto_detect = auto_detect;
        self
    }

    /// Replace the candidate set scored during auto-detection. Order decides
    /// ties: the first listed candidate wins.
    ///
    /// # Examples
    /// ```
    /// use tabwire::ParseOptions;
    ///
    /// let opts = ParseOptions::new().with_candidates(&[',', '#']);
    /// assert_eq!(opts.candidates, vec![',', '#']);
    /// ```
    pub fn with_candidates(mut self, candidates: &[char]) -> Self {
        self.candidates = candidates.to_vec();
        self
    }

    /// Treat the first row as data instead of column names.
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    /// Rename a derived header before rows are keyed by it.
    ///
    /// # Examples
    /// ```
    /// use tabwire::ParseOptions;
    ///
    /// let opts = ParseOptions::new().with_rename("usr_nm", "user_name");
    /// let _ = opts;
    /// ```
    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rename.push((from.into(), to.into()));
        self
    }

    /// Choose between keyed records and plain arrays.
    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Cap the number of rows a bulk parse may produce.
    ///
    /// # Examples
    /// ```
    /// use tabwire::ParseOptions;
    ///
    /// let opts = ParseOptions::new().with_max_rows(10_000);
    /// assert_eq!(opts.max_rows, Some(10_000));
    /// ```
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Set the per-row failure policy.
    pub fn with_on_error(mut self, on_error: ErrorMode) -> Self {
        self.on_error = on_error;
        self
    }

    /// Enable or disable row-shift repair (objects mode only).
    pub fn with_repair_row_shifts(mut self, repair: bool) -> Self {
        self.repair_row_shifts = repair;
        self
    }

    /// Trim surrounding whitespace from values and header names.
    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// Coerce numeric and boolean literals to typed values (strings like
    /// `"123"` become numbers). Quoted fields are never coerced.
    ///
    /// # Examples
    /// ```
    /// use tabwire::ParseOptions;
    ///
    /// let opts = ParseOptions::new().with_coerce_types(true);
    /// assert!(opts.coerce_types);
    /// ```
    pub fn with_coerce_types(mut self, coerce: bool) -> Self {
        self.coerce_types = coerce;
        self
    }

    /// Control whether unquoted empty fields become null. A quoted empty
    /// field stays an empty string either way.
    pub fn with_empty_as_null(mut self, empty_as_null: bool) -> Self {
        self.empty_as_null = empty_as_null;
        self
    }

    /// Reject rows whose width differs from the header width instead of
    /// padding or truncating them.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Share a delimiter-detection cache across calls.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use tabwire::{DelimiterCache, ParseOptions};
    ///
    /// let cache = Arc::new(DelimiterCache::new(32));
    /// let opts = ParseOptions::new().with_delimiter_cache(cache);
    /// let _ = opts;
    /// ```
    pub fn with_delimiter_cache(mut self, cache: Arc<DelimiterCache>) -> Self {
        self.delimiter_cache = Some(cache);
        self
    }

    /// Share a compiled-parser cache across calls.
    pub fn with_parser_cache(mut self, cache: Arc<ParserCache>) -> Self {
        self.parser_cache = Some(cache);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.delimiter.is_none() && !self.auto_detect {
            return Err(Error::configuration(
                "either a fixed delimiter or auto_detect is required",
            ));
        }
        if self.delimiter.is_none() && self.candidates.is_empty() {
            return Err(Error::configuration("candidate set must not be empty"));
        }
        for &ch in self.delimiter.iter().chain(self.candidates.iter()) {
            if ch == QUOTE || ch == '\n' || ch == '\r' {
                return Err(Error::configuration(format!(
                    "{ch:?} cannot be used as a delimiter"
                )));
            }
        }
        Ok(())
    }
}

/// Options for serializing records to delimited text.
///
/// # Examples
/// ```
/// use tabwire::{LineEnding, SerializeOptions};
///
/// let opts = SerializeOptions::new()
///     .with_delimiter(';')
///     .with_line_ending(LineEnding::CrLf);
/// let _ = opts;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    pub delimiter: char,
    pub line_ending: LineEnding,
    /// Emit a header row derived from record keys.
    pub write_headers: bool,
    /// Column template; listed names come first, remaining keys follow in
    /// first-seen order.
    pub columns: Option<Vec<String>>,
    /// Header renames applied to emitted names, not lookup keys.
    pub rename: Vec<(String, String)>,
    /// Prepend a UTF-8 byte-order mark for spreadsheet applications.
    pub include_bom: bool,
    /// Prefix formula-like values with a protection marker.
    pub escape_formulas: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            line_ending: LineEnding::default(),
            write_headers: true,
            columns: None,
            rename: Vec::new(),
            include_bom: false,
            escape_formulas: true,
        }
    }
}

impl SerializeOptions {
    /// Create new serialize options with defaults (comma, LF, headers on).
    ///
    /// # Examples
    /// ```
    /// use tabwire::SerializeOptions;
    ///
    /// let opts = SerializeOptions::new();
    /// assert_eq!(opts.delimiter, ',');
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn with_write_headers(mut self, write_headers: bool) -> Self {
        self.write_headers = write_headers;
        self
    }

    /// Set the column template controlling header order.
    ///
    /// # Examples
    /// ```
    /// use tabwire::SerializeOptions;
    ///
    /// let opts = SerializeOptions::new().with_columns(&["id", "name"]);
    /// let _ = opts;
    /// ```
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Rename an emitted header. Lookup keys are unchanged.
    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rename.push((from.into(), to.into()));
        self
    }

    pub fn with_bom(mut self, include_bom: bool) -> Self {
        self.include_bom = include_bom;
        self
    }

    pub fn with_escape_formulas(mut self, escape: bool) -> Self {
        self.escape_formulas = escape;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.delimiter == QUOTE || self.delimiter == '\n' || self.delimiter == '\r' {
            return Err(Error::configuration(format!(
                "{:?} cannot be used as a delimiter",
                self.delimiter
            )));
        }
        Ok(())
    }

    pub(crate) fn renamed<'a>(&'a self, name: &'a str) -> &'a str {
        self.rename
            .iter()
            .find(|(from, _)| from == name)
            .map(|(_, to)| to.as_str())
            .unwrap_or(name)
    }
}
