//! TagVal frame extraction, field parsing and message building.
//!
//! A message on the wire is
//!
//! ```text
//! 0x01 0x01 <2-char type code> key=value| key=value| ... 0x02
//! ```
//!
//! where any literal `=`, `|`, backslash or marker byte inside a value is
//! escaped by a preceding backslash. Both directions use the same escaping;
//! [`MessageWriter`] escapes what [`FieldMap`] un-escapes, so every
//! representable value round-trips.

use std::collections::HashMap;

use bytes::{Buf, BytesMut};

use crate::constants::*;
use crate::error::ProtocolError;

/// Accumulates raw transport bytes and extracts one framed message at a
/// time. Garbage before a start marker and frames for other protocol ids
/// are skipped.
#[derive(Debug, Default)]
pub struct TagValCodec {
    buffer: BytesMut,
}

impl TagValCodec {
    /// Create an empty codec.
    pub fn new() -> Self {
        TagValCodec { buffer: BytesMut::with_capacity(256) }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract the next complete frame.
    ///
    /// Returns the message body (type code plus fields, markers stripped),
    /// or `None` when no complete frame is buffered yet.
    pub fn next_frame(&mut self) -> Option<String> {
        loop {
            // Discard anything before a start marker.
            while !self.buffer.is_empty() && self.buffer[0] != TAG_START_OF_MSG {
                self.buffer.advance(1);
            }
            // Need the start marker and the protocol id.
            if self.buffer.len() < 2 {
                return None;
            }
            if self.buffer[1] != PROTOCOL_TAG_VAL {
                // Not ours; drop the marker and keep scanning.
                self.buffer.advance(1);
                continue;
            }
            // The end marker may legitimately appear escaped inside a value.
            let mut escaped = false;
            let mut end = None;
            for (i, &b) in self.buffer[2..].iter().enumerate() {
                if escaped {
                    escaped = false;
                } else if b == TAG_ESCAPE as u8 {
                    escaped = true;
                } else if b == TAG_END_OF_MSG {
                    end = Some(i);
                    break;
                }
            }
            let Some(end) = end else {
                return None;
            };
            self.buffer.advance(2);
            let frame = self.buffer.split_to(end);
            self.buffer.advance(1); // end marker
            return Some(String::from_utf8_lossy(&frame).into_owned());
        }
    }

    /// Number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer, discarding any partial frame.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Parsed key/value fields of one message.
///
/// Unknown keys are retained and simply never read. Lookups distinguish
/// required fields (absence is a [`ProtocolError::KeyNotDefined`]) from
/// defaulted ones.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldMap {
    fields: HashMap<String, String>,
}

impl FieldMap {
    /// Parse the field section of a message (everything after the type
    /// code). An empty key token before the input ends is a framing error.
    pub fn parse(body: &str) -> Result<Self, ProtocolError> {
        let mut fields = HashMap::new();
        let mut chars = body.chars();
        loop {
            let key = read_token(&mut chars);
            if key.is_empty() {
                if chars.as_str().is_empty() {
                    break;
                }
                return Err(ProtocolError::UnexpectedEom);
            }
            let value = read_token(&mut chars);
            fields.insert(key, value);
            if chars.as_str().is_empty() {
                break;
            }
        }
        Ok(FieldMap { fields })
    }

    /// A required string field.
    pub fn get(&self, key: &str) -> Result<&str, ProtocolError> {
        self.fields
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ProtocolError::KeyNotDefined(key.to_string()))
    }

    /// An optional string field with a default.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.fields.get(key).map(String::as_str).unwrap_or(default)
    }

    /// A required integer field.
    pub fn get_i64(&self, key: &str) -> Result<i64, ProtocolError> {
        let raw = self.get(key)?;
        raw.trim().parse().map_err(|_| ProtocolError::BadNumber {
            key: key.to_string(),
            value: raw.to_string(),
        })
    }

    /// An optional integer field with a default.
    pub fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        self.fields
            .get(key)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(default)
    }

    /// A required floating point field.
    pub fn get_f64(&self, key: &str) -> Result<f64, ProtocolError> {
        let raw = self.get(key)?;
        raw.trim().parse().map_err(|_| ProtocolError::BadNumber {
            key: key.to_string(),
            value: raw.to_string(),
        })
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }
}

/// Read one token up to an unescaped `=` or `|`, un-escaping as it goes.
fn read_token(chars: &mut std::str::Chars<'_>) -> String {
    let mut value = String::new();
    while let Some(ch) = chars.next() {
        if ch == TAG_ESCAPE {
            if let Some(escaped) = chars.next() {
                value.push(escaped);
            }
        } else if ch == TAG_KEY_SEPARATOR || ch == TAG_FIELD_TERMINATOR {
            break;
        } else {
            value.push(ch);
        }
    }
    value
}

/// Split a frame into its type code and parsed fields.
pub fn parse_frame(frame: &str) -> Result<(&str, FieldMap), ProtocolError> {
    if frame.len() < MIN_MESSAGE_LEN {
        return Err(ProtocolError::MessageTooSmall { actual: frame.len() });
    }
    // Garbled input becomes a multi-byte replacement char, so byte index 2
    // may land inside it.
    if !frame.is_char_boundary(2) {
        return Err(ProtocolError::BadTypeCode);
    }
    let (type_code, body) = frame.split_at(2);
    Ok((type_code, FieldMap::parse(body)?))
}

/// Builds one outgoing frame, escaping reserved characters in values.
#[derive(Debug)]
pub struct MessageWriter {
    out: String,
}

impl MessageWriter {
    /// Start a message of the given type.
    pub fn new(type_code: &str) -> Self {
        let mut out = String::with_capacity(64);
        out.push(TAG_START_OF_MSG as char);
        out.push(PROTOCOL_TAG_VAL as char);
        out.push_str(type_code);
        MessageWriter { out }
    }

    /// Append one `key=value|` field, escaping the value.
    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.out.push_str(key);
        self.out.push(TAG_KEY_SEPARATOR);
        for ch in value.chars() {
            if needs_escape(ch) {
                self.out.push(TAG_ESCAPE);
            }
            self.out.push(ch);
        }
        self.out.push(TAG_FIELD_TERMINATOR);
        self
    }

    /// Append a numeric field.
    pub fn field_i64(self, key: &str, value: i64) -> Self {
        self.field(key, &value.to_string())
    }

    /// Terminate the message with the end marker.
    pub fn finish(mut self) -> String {
        self.out.push(TAG_END_OF_MSG as char);
        self.out
    }
}

fn needs_escape(ch: char) -> bool {
    ch == TAG_KEY_SEPARATOR
        || ch == TAG_FIELD_TERMINATOR
        || ch == TAG_ESCAPE
        || ch == TAG_START_OF_MSG as char
        || ch == TAG_END_OF_MSG as char
}

/// Render a raw message with control bytes visible, for logging.
pub fn to_printable(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if (ch as u32) < 31 {
            out.push_str(&format!("<{}>", ch as u32));
        } else {
            out.push(ch);
        }
    }
    out
}
