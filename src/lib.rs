//! # tabwire
//!
//! A delimited-text (CSV/TSV-like) parsing and streaming engine.
//!
//! The pipeline: delimiter auto-detection (with a bounded LRU cache),
//! structural analysis that compiles one of three parsing strategies, value
//! normalization with formula-injection neutralization, a best-effort
//! repair pass for rows mis-split across a quoted line break, and a
//! chunked streaming layer that never splits a field value across a chunk
//! boundary. The reverse direction serializes any `Serialize` array of
//! records back to RFC-4180-style text.
//!
//! # Example
//!
//! ```rust
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, PartialEq)]
//! struct User {
//!     id: String,
//!     name: String,
//! }
//!
//! fn main() -> tabwire::Result<()> {
//!     let users: Vec<User> = tabwire::from_str("id,name\n1,Ada\n2,Grace")?;
//!     assert_eq!(users.len(), 2);
//!     assert_eq!(users[0].name, "Ada");
//!     Ok(())
//! }
//! ```
//!
//! Parsing to untyped rows, with options:
//!
//! ```rust
//! use tabwire::{parse_str_with_options, ParseOptions};
//!
//! let rows = parse_str_with_options(
//!     "id;name\n1;Ada",
//!     &ParseOptions::new().with_coerce_types(true),
//! ).unwrap();
//! assert_eq!(rows[0]["id"], 1);
//! ```

pub mod analyze;
pub mod constants;
pub mod detect;
pub mod error;
pub mod options;
pub mod parse;
pub mod serialize;
pub mod stream;

mod normalize;
mod repair;

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use crate::analyze::{analyze, Strategy, StructureDescriptor};
pub use crate::detect::{detect_delimiter, DelimiterCache};
pub use crate::error::Error;
pub use crate::options::{ErrorMode, LineEnding, OutputMode, ParseOptions, SerializeOptions};
pub use crate::parse::ParserCache;
pub use crate::serialize::RecordWriter;
pub use crate::stream::{RowReader, StreamParser};

pub type Result<T> = std::result::Result<T, Error>;

/// Parse delimited text into untyped rows (objects mode by default).
pub fn parse_str(input: &str) -> Result<Vec<Value>> {
    parse_str_with_options(input, &ParseOptions::default())
}

pub fn parse_str_with_options(input: &str, options: &ParseOptions) -> Result<Vec<Value>> {
    parse::parse_to_rows(input, options)
}

/// Parse delimited bytes; the input must be valid UTF-8 (a leading
/// byte-order mark is stripped).
pub fn parse_slice(input: &[u8]) -> Result<Vec<Value>> {
    parse_slice_with_options(input, &ParseOptions::default())
}

pub fn parse_slice_with_options(input: &[u8], options: &ParseOptions) -> Result<Vec<Value>> {
    let text = std::str::from_utf8(input)
        .map_err(|err| Error::validation(format!("invalid utf-8: {err}")))?;
    parse_str_with_options(text, options)
}

/// Parse delimited text straight into any `Deserialize` collection.
pub fn from_str<T: DeserializeOwned>(input: &str) -> Result<T> {
    from_str_with_options(input, &ParseOptions::default())
}

pub fn from_str_with_options<T: DeserializeOwned>(
    input: &str,
    options: &ParseOptions,
) -> Result<T> {
    let rows = parse::parse_to_rows(input, options)?;
    serde_json::from_value(Value::Array(rows))
        .map_err(|err| Error::validation(format!("deserialize failed: {err}")))
}

pub fn from_reader<T: DeserializeOwned, R: Read>(reader: R) -> Result<T> {
    from_reader_with_options(reader, &ParseOptions::default())
}

pub fn from_reader_with_options<T: DeserializeOwned, R: Read>(
    mut reader: R,
    options: &ParseOptions,
) -> Result<T> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    from_str_with_options(&buf, options)
}

/// Structural check without materializing rows.
pub fn validate_str(input: &str) -> Result<()> {
    validate_str_with_options(input, &ParseOptions::default())
}

pub fn validate_str_with_options(input: &str, options: &ParseOptions) -> Result<()> {
    parse::parse_to_rows(input, options).map(|_| ())
}

/// Serialize an array of records to delimited text.
pub fn to_string<T: Serialize>(records: &T) -> Result<String> {
    to_string_with_options(records, &SerializeOptions::default())
}

pub fn to_string_with_options<T: Serialize>(
    records: &T,
    options: &SerializeOptions,
) -> Result<String> {
    serialize::to_string(records, options)
}

pub fn to_vec<T: Serialize>(records: &T) -> Result<Vec<u8>> {
    to_vec_with_options(records, &SerializeOptions::default())
}

pub fn to_vec_with_options<T: Serialize>(
    records: &T,
    options: &SerializeOptions,
) -> Result<Vec<u8>> {
    serialize::to_vec(records, options)
}

pub fn to_writer<T: Serialize, W: Write>(writer: W, records: &T) -> Result<()> {
    to_writer_with_options(writer, records, &SerializeOptions::default())
}

pub fn to_writer_with_options<T: Serialize, W: Write>(
    writer: W,
    records: &T,
    options: &SerializeOptions,
) -> Result<()> {
    serialize::to_writer(writer, records, options)
}
