//! Low-level output buffer: field rendering, RFC-4180 escaping, injection
//! neutralization, terminators and the optional byte-order mark.

use serde_json::Value;

use crate::error::Error;
use crate::normalize::neutralize;
use crate::options::SerializeOptions;
use crate::Result;

const BOM: &[u8] = "\u{FEFF}".as_bytes();

pub(crate) struct Writer {
    buffer: Vec<u8>,
    pub(crate) options: SerializeOptions,
}

impl Writer {
    pub fn new(options: SerializeOptions) -> Self {
        let mut buffer = Vec::new();
        if options.include_bom {
            buffer.extend_from_slice(BOM);
        }
        Self { buffer, options }
    }

    pub fn finish(self) -> String {
        String::from_utf8(self.buffer).expect("writer output must be valid UTF-8")
    }

    pub fn finish_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Drain the buffered bytes, leaving the writer reusable. Used by the
    /// record-at-a-time surface.
    pub fn take_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    pub fn write_terminator(&mut self) {
        self.buffer
            .extend_from_slice(self.options.line_ending.as_str().as_bytes());
    }

    pub fn write_delimiter(&mut self) {
        let mut buf = [0u8; 4];
        let encoded = self.options.delimiter.encode_utf8(&mut buf);
        self.buffer.extend_from_slice(encoded.as_bytes());
    }

    /// Write one row of cells, delimiters between them, terminator after.
    pub fn write_row<'a, I>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        for (idx, cell) in cells.into_iter().enumerate() {
            if idx > 0 {
                self.write_delimiter();
            }
            self.write_cell_value(cell)?;
        }
        self.write_terminator();
        Ok(())
    }

    pub fn write_header_row<'a, I>(&mut self, names: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for (idx, name) in names.into_iter().enumerate() {
            if idx > 0 {
                self.write_delimiter();
            }
            self.write_cell_str(name);
        }
        self.write_terminator();
    }

    /// Render a value into one cell. Null is the empty cell; nested arrays
    /// and objects are JSON-encoded into the cell and escaped like any
    /// other text.
    pub fn write_cell_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => Ok(()),
            Value::Bool(flag) => {
                self.write_cell_str(if *flag { "true" } else { "false" });
                Ok(())
            }
            Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    let mut buf = itoa::Buffer::new();
                    self.write_cell_str(buf.format(int));
                } else if let Some(uint) = number.as_u64() {
                    let mut buf = itoa::Buffer::new();
                    self.write_cell_str(buf.format(uint));
                } else if let Some(float) = number.as_f64() {
                    let mut buf = ryu::Buffer::new();
                    self.write_cell_str(buf.format(float));
                }
                Ok(())
            }
            Value::String(text) => {
                self.write_cell_str(text);
                Ok(())
            }
            nested @ (Value::Array(_) | Value::Object(_)) => {
                let json = serde_json::to_string(nested)
                    .map_err(|err| Error::validation(format!("serialize failed: {err}")))?;
                self.write_cell_str(&json);
                Ok(())
            }
        }
    }

    /// Neutralization runs before the quoting decision: the protection
    /// marker itself never forces quotes, the content does.
    pub fn write_cell_str(&mut self, text: &str) {
        let text = if self.options.escape_formulas {
            neutralize(text)
        } else {
            std::borrow::Cow::Borrowed(text)
        };

        if self.needs_quoting(&text) {
            self.buffer.push(b'"');
            for ch in text.chars() {
                if ch == '"' {
                    self.buffer.extend_from_slice(b"\"\"");
                } else {
                    let mut buf = [0u8; 4];
                    self.buffer
                        .extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                }
            }
            self.buffer.push(b'"');
        } else {
            self.buffer.extend_from_slice(text.as_bytes());
        }
    }

    fn needs_quoting(&self, text: &str) -> bool {
        text.chars().any(|ch| {
            ch == self.options.delimiter || ch == '"' || ch == '\n' || ch == '\r'
        })
    }
}
