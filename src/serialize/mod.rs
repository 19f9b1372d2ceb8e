//! Records to delimited text.
//!
//! Any `Serialize` value whose JSON form is an array of objects (or an
//! array of arrays) can be written. Header order is the column template
//! first, then remaining keys in first-seen order; the rename map changes
//! emitted names only, never lookup keys.

pub(crate) mod writer;

use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use crate::error::Error;
use crate::options::SerializeOptions;
use crate::Result;

use writer::Writer;

pub(crate) fn to_string<T: Serialize>(value: &T, options: &SerializeOptions) -> Result<String> {
    options.validate()?;
    let value = to_json(value)?;
    let mut writer = Writer::new(options.clone());
    write_document(&value, &mut writer)?;
    Ok(writer.finish())
}

pub(crate) fn to_vec<T: Serialize>(value: &T, options: &SerializeOptions) -> Result<Vec<u8>> {
    options.validate()?;
    let value = to_json(value)?;
    let mut writer = Writer::new(options.clone());
    write_document(&value, &mut writer)?;
    Ok(writer.finish_bytes())
}

pub(crate) fn to_writer<T: Serialize, W: Write>(
    mut out: W,
    value: &T,
    options: &SerializeOptions,
) -> Result<()> {
    let bytes = to_vec(value, options)?;
    out.write_all(&bytes)?;
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|err| Error::validation(format!("serialize failed: {err}")))
}

fn write_document(value: &Value, writer: &mut Writer) -> Result<()> {
    let Value::Array(records) = value else {
        return Err(Error::validation("expected an array of records"));
    };

    let objects = match records.first() {
        None => {
            // Nothing to derive headers from; only an explicit template
            // can produce output.
            if writer.options.write_headers {
                if let Some(columns) = &writer.options.columns {
                    let names = renamed_all(&writer.options, columns);
                    writer.write_header_row(names.iter().map(String::as_str));
                }
            }
            return Ok(());
        }
        Some(Value::Object(_)) => true,
        Some(Value::Array(_)) => false,
        Some(_) => {
            return Err(Error::validation(
                "records must be objects or arrays of values",
            ));
        }
    };

    if objects {
        let headers = derive_headers(records, writer.options.columns.as_deref())?;
        if writer.options.write_headers {
            let names = renamed_all(&writer.options, &headers);
            writer.write_header_row(names.iter().map(String::as_str));
        }
        for record in records {
            let Value::Object(map) = record else {
                return Err(Error::validation("mixed record shapes in input"));
            };
            let row = headers.iter().map(|h| map.get(h).unwrap_or(&Value::Null));
            writer.write_row(row)?;
        }
    } else {
        if writer.options.write_headers {
            if let Some(columns) = &writer.options.columns {
                let names = renamed_all(&writer.options, columns);
                writer.write_header_row(names.iter().map(String::as_str));
            }
        }
        for record in records {
            let Value::Array(cells) = record else {
                return Err(Error::validation("mixed record shapes in input"));
            };
            writer.write_row(cells.iter())?;
        }
    }
    Ok(())
}

fn renamed_all(options: &SerializeOptions, names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|name| options.renamed(name).to_string())
        .collect()
}

/// Column template order first, remaining keys in first-seen order.
fn derive_headers(records: &[Value], columns: Option<&[String]>) -> Result<Vec<String>> {
    let mut headers: Vec<String> = columns.map(<[String]>::to_vec).unwrap_or_default();
    for record in records {
        let Value::Object(map) = record else {
            return Err(Error::validation("mixed record shapes in input"));
        };
        for key in map.keys() {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.clone());
            }
        }
    }
    Ok(headers)
}

/// Record-at-a-time serializer honoring the caller-pull contract: bytes for
/// a record are handed to the underlying writer before the next record is
/// accepted.
///
/// Headers are fixed by the first record (template columns first, then that
/// record's keys) and not revisited.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use tabwire::{RecordWriter, SerializeOptions};
///
/// let mut out = Vec::new();
/// let mut writer = RecordWriter::new(&mut out, SerializeOptions::default()).unwrap();
/// writer.write_record(&json!({"id": 1, "name": "Ada"})).unwrap();
/// writer.write_record(&json!({"id": 2, "name": "Grace"})).unwrap();
/// writer.finish().unwrap();
/// assert_eq!(String::from_utf8(out).unwrap(), "id,name\n1,Ada\n2,Grace\n");
/// ```
pub struct RecordWriter<W: Write> {
    inner: W,
    writer: Writer,
    headers: Option<Vec<String>>,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W, options: SerializeOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            inner,
            writer: Writer::new(options),
            headers: None,
        })
    }

    pub fn write_record<T: Serialize>(&mut self, record: &T) -> Result<()> {
        let value = to_json(record)?;
        match &value {
            Value::Object(map) => {
                if self.headers.is_none() {
                    let headers = derive_headers(
                        std::slice::from_ref(&value),
                        self.writer.options.columns.as_deref(),
                    )?;
                    if self.writer.options.write_headers {
                        let names = renamed_all(&self.writer.options, &headers);
                        self.writer.write_header_row(names.iter().map(String::as_str));
                    }
                    self.headers = Some(headers);
                }
                let Some(headers) = &self.headers else {
                    return Ok(());
                };
                let row = headers.iter().map(|h| map.get(h).unwrap_or(&Value::Null));
                self.writer.write_row(row)?;
            }
            Value::Array(cells) => {
                self.writer.write_row(cells.iter())?;
            }
            _ => {
                return Err(Error::validation(
                    "records must be objects or arrays of values",
                ));
            }
        }
        let bytes = self.writer.take_bytes();
        self.inner.write_all(&bytes)?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
