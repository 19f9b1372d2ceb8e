use thiserror::Error;

/// Errors produced by the parsing and serialization engine.
///
/// Structural failures that occur before a header row is established are
/// always fatal. Per-row failures after that point are routed through the
/// configured [`ErrorMode`](crate::options::ErrorMode); limit violations are
/// never routed and always abort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed call arguments (non-tabular input, invalid UTF-8, misuse of
    /// a streaming handle).
    #[error("invalid argument: {message}")]
    Validation { message: String },

    /// Invalid option value or option combination.
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    /// Structural parse failure at a known physical line (1-based).
    #[error("parse error on line {line}: {message}")]
    Parsing { line: usize, message: String },

    /// Row width differs from the header width. Raised only in strict mode.
    #[error("line {line}: expected {expected} fields, found {actual}")]
    FieldCount {
        line: usize,
        expected: usize,
        actual: usize,
    },

    /// Bulk-mode row ceiling exceeded.
    #[error("row limit exceeded: limit {limit}, actual {actual}")]
    Limit { limit: usize, actual: usize },

    /// Underlying reader or writer failure.
    #[error("i/o error: {message}")]
    Io { message: String },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    pub fn parsing(line: usize, message: impl Into<String>) -> Self {
        Error::Parsing {
            line,
            message: message.into(),
        }
    }

    pub fn field_count(line: usize, expected: usize, actual: usize) -> Self {
        Error::FieldCount {
            line,
            expected,
            actual,
        }
    }

    pub fn limit(limit: usize, actual: usize) -> Self {
        Error::Limit { limit, actual }
    }

    /// Physical line context, when the error carries one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Parsing { line, .. } | Error::FieldCount { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
        }
    }
}
