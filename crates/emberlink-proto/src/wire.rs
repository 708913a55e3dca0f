//! Field-level codecs for packet payloads.
//!
//! Strings are encoded as a one-byte length prefix followed by UTF-8
//! bytes, truncated to a declared maximum; an empty string is a single
//! zero byte. Rule inputs and outputs carry a fixed 64-byte extended
//! data block packing up to four length-prefixed sub-fields, replacing
//! the historical pipe-delimited packing so sub-field values may contain
//! any character.

use crate::error::ProtoError;
use crate::EXT_BLOCK_LEN;

/// Growable payload writer
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    /// Create an empty writer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single byte
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Append a big-endian 16-bit value
    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Append a boolean as 0 or 1
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Append a length-prefixed string, truncated to `max` bytes at a
    /// character boundary. Empty strings encode as a single zero byte.
    pub fn write_str(&mut self, value: &str, max: usize) {
        let truncated = truncate_utf8(value, max.min(u8::MAX as usize));
        self.buf.push(truncated.len() as u8);
        self.buf.extend_from_slice(truncated.as_bytes());
    }

    /// Append a fixed 64-byte extended data block holding `fields` as
    /// length-prefixed sub-fields, zero-padded. Sub-fields are truncated
    /// (whole block budget, character boundaries respected) when they do
    /// not fit.
    pub fn write_ext(&mut self, fields: &[&str]) {
        let start = self.buf.len();
        self.buf.push(0); // sub-field count, patched below
        let mut remaining = EXT_BLOCK_LEN - 1;
        let mut written = 0u8;
        for field in fields {
            if remaining == 0 {
                break;
            }
            let truncated = truncate_utf8(field, (remaining - 1).min(u8::MAX as usize));
            self.buf.push(truncated.len() as u8);
            self.buf.extend_from_slice(truncated.as_bytes());
            remaining -= 1 + truncated.len();
            written += 1;
        }
        self.buf[start] = written;
        self.buf.resize(start + EXT_BLOCK_LEN, 0);
    }

    /// Consume the writer, returning the payload
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.buf
    }

    /// Bytes written so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Payload reader with a running position
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Wrap a payload for reading
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes left to read
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtoError> {
        if self.remaining() < n {
            return Err(ProtoError::Truncated {
                needed: n - self.remaining(),
                offset: self.pos,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> Result<u8, ProtoError> {
        Ok(self.take(1)?[0])
    }

    /// Read a big-endian 16-bit value
    pub fn read_u16(&mut self) -> Result<u16, ProtoError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a boolean (any nonzero byte is true)
    pub fn read_bool(&mut self) -> Result<bool, ProtoError> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a length-prefixed string
    pub fn read_str(&mut self) -> Result<String, ProtoError> {
        let len = self.read_u8()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a fixed 64-byte extended data block, returning its sub-fields
    pub fn read_ext(&mut self) -> Result<Vec<String>, ProtoError> {
        let block = self.take(EXT_BLOCK_LEN)?;
        let mut inner = WireReader::new(block);
        let count = inner.read_u8()? as usize;
        let mut fields = Vec::with_capacity(count.min(4));
        for _ in 0..count {
            fields.push(inner.read_str()?);
        }
        Ok(fields)
    }
}

/// Truncate to at most `max` bytes without splitting a UTF-8 sequence
fn truncate_utf8(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_roundtrip() {
        let mut w = WireWriter::new();
        w.write_u8(0x42);
        w.write_u16(0x1234);
        w.write_bool(true);
        w.write_bool(false);
        let payload = w.into_payload();

        let mut r = WireReader::new(&payload);
        assert_eq!(r.read_u8().unwrap(), 0x42);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert!(r.read_bool().unwrap());
        assert!(!r.read_bool().unwrap());
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn string_roundtrip() {
        let mut w = WireWriter::new();
        w.write_str("Ground Floor", 32);
        w.write_str("", 32);
        let payload = w.into_payload();

        let mut r = WireReader::new(&payload);
        assert_eq!(r.read_str().unwrap(), "Ground Floor");
        assert_eq!(r.read_str().unwrap(), "");
    }

    #[test]
    fn string_truncated_to_max() {
        let long = "x".repeat(40);
        let mut w = WireWriter::new();
        w.write_str(&long, 32);
        let payload = w.into_payload();
        assert_eq!(payload.len(), 33);

        let mut r = WireReader::new(&payload);
        assert_eq!(r.read_str().unwrap(), "x".repeat(32));
    }

    #[test]
    fn string_truncation_respects_char_boundary() {
        // Four 3-byte characters; a 10-byte budget must back off to 9.
        let value = "€€€€";
        let mut w = WireWriter::new();
        w.write_str(value, 10);
        let payload = w.into_payload();
        assert_eq!(payload[0], 9);

        let mut r = WireReader::new(&payload);
        assert_eq!(r.read_str().unwrap(), "€€€");
    }

    #[test]
    fn ext_block_roundtrip() {
        let mut w = WireWriter::new();
        w.write_ext(&["https://alarm.example/hook", "/fire", "s3cret"]);
        let payload = w.into_payload();
        assert_eq!(payload.len(), EXT_BLOCK_LEN);

        let mut r = WireReader::new(&payload);
        assert_eq!(
            r.read_ext().unwrap(),
            vec!["https://alarm.example/hook", "/fire", "s3cret"]
        );
    }

    #[test]
    fn ext_block_allows_delimiter_bytes() {
        // The historical encoding split on '|'; the structured block must
        // carry it intact.
        let mut w = WireWriter::new();
        w.write_ext(&["a|b", "c|d"]);
        let payload = w.into_payload();

        let mut r = WireReader::new(&payload);
        assert_eq!(r.read_ext().unwrap(), vec!["a|b", "c|d"]);
    }

    #[test]
    fn ext_block_truncates_oversized_fields() {
        let huge = "y".repeat(100);
        let mut w = WireWriter::new();
        w.write_ext(&[&huge]);
        let payload = w.into_payload();
        assert_eq!(payload.len(), EXT_BLOCK_LEN);

        let mut r = WireReader::new(&payload);
        let fields = r.read_ext().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0], "y".repeat(EXT_BLOCK_LEN - 2));
    }

    #[test]
    fn ext_block_empty_fields() {
        let mut w = WireWriter::new();
        w.write_ext(&[]);
        let payload = w.into_payload();
        assert_eq!(payload.len(), EXT_BLOCK_LEN);
        assert!(payload.iter().all(|&b| b == 0));

        let mut r = WireReader::new(&payload);
        assert!(r.read_ext().unwrap().is_empty());
    }

    #[test]
    fn truncated_payload_reported() {
        let mut r = WireReader::new(&[0x01]);
        let err = r.read_u16().unwrap_err();
        assert_eq!(err, ProtoError::Truncated { needed: 1, offset: 0 });
    }
}
