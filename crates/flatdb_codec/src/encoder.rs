//! Canonical CBOR encoder.

use crate::value::Value;

/// Encode a value to canonical CBOR bytes.
///
/// Every header uses its shortest form and lengths are always definite, so
/// equal values always encode to equal bytes.
pub fn to_canonical_cbor(value: &Value) -> Vec<u8> {
    let mut encoder = CanonicalEncoder::new();
    encoder.encode(value);
    encoder.into_bytes()
}

/// Appends canonical CBOR items to an owned buffer.
#[derive(Debug, Default)]
pub struct CanonicalEncoder {
    buffer: Vec<u8>,
}

impl CanonicalEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Appends one value.
    pub fn encode(&mut self, value: &Value) {
        match value {
            Value::Bytes(bytes) => {
                self.write_head(value.major_type(), bytes.len() as u64);
                self.buffer.extend_from_slice(bytes);
            }
            Value::Text(text) => {
                self.write_head(value.major_type(), text.len() as u64);
                self.buffer.extend_from_slice(text.as_bytes());
            }
            Value::Array(items) => {
                self.write_head(value.major_type(), items.len() as u64);
                items.iter().for_each(|item| self.encode(item));
            }
        }
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Returns the bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Writes a header with the argument in the fewest bytes that hold it.
    fn write_head(&mut self, major: u8, argument: u64) {
        let major = major << 5;
        let be = argument.to_be_bytes();
        let (info, width) = match argument {
            0..=23 => {
                self.buffer.push(major | be[7]);
                return;
            }
            24..=0xff => (24, 1),
            0x100..=0xffff => (25, 2),
            0x1_0000..=0xffff_ffff => (26, 4),
            _ => (27, 8),
        };
        self.buffer.push(major | info);
        self.buffer.extend_from_slice(&be[8 - width..]);
    }
}
