//! Canonical CBOR decoder.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Decode exactly one value from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not canonical CBOR of a supported
/// type, or if bytes remain after the value.
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    let mut decoder = CanonicalDecoder::new(bytes);
    let value = decoder.decode()?;
    if !decoder.is_empty() {
        return Err(CodecError::TrailingBytes {
            remaining: decoder.remaining().len(),
        });
    }
    Ok(value)
}

/// Largest element count accepted for an array.
const MAX_CONTAINER_ELEMENTS: u64 = 1024;

/// Deepest array nesting accepted.
const MAX_DEPTH: usize = 16;

/// Largest byte or text string length accepted.
const MAX_BYTES_LENGTH: u64 = 256 * 1024 * 1024;

/// A canonical CBOR decoder over a borrowed buffer.
///
/// Every construct the encoder never emits is rejected: integers, maps,
/// tags, simple values, indefinite lengths, over-long length headers and
/// arrays nested deeper than a fixed limit.
pub struct CanonicalDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> CanonicalDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> CodecResult<Value> {
        self.decode_at(0)
    }

    fn decode_at(&mut self, depth: usize) -> CodecResult<Value> {
        let (major, len) = self.read_head()?;
        match major {
            2 => {
                let len = Self::bounded(len, MAX_BYTES_LENGTH)?;
                Ok(Value::Bytes(self.take(len)?.to_vec()))
            }
            3 => {
                let len = Self::bounded(len, MAX_BYTES_LENGTH)?;
                let text = std::str::from_utf8(self.take(len)?)
                    .map_err(|_| CodecError::InvalidUtf8)?;
                Ok(Value::Text(text.to_owned()))
            }
            4 => {
                if depth >= MAX_DEPTH {
                    return Err(CodecError::DepthLimitExceeded { max: MAX_DEPTH });
                }
                let count = Self::bounded(len, MAX_CONTAINER_ELEMENTS)?;
                (0..count)
                    .map(|_| self.decode_at(depth + 1))
                    .collect::<CodecResult<Vec<_>>>()
                    .map(Value::Array)
            }
            other => Err(CodecError::unsupported_type(format!("major type {other}"))),
        }
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    fn take(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(CodecError::UnexpectedEof)?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Reads an item header, returning its major type and argument.
    fn read_head(&mut self) -> CodecResult<(u8, u64)> {
        let initial = self.take(1)?[0];
        let major = initial >> 5;
        if !(2..=4).contains(&major) {
            return Err(CodecError::unsupported_type(format!("major type {major}")));
        }
        let width = match initial & 0x1f {
            info @ 0..=23 => return Ok((major, u64::from(info))),
            24 => 1,
            25 => 2,
            26 => 4,
            27 => 8,
            31 => return Err(CodecError::IndefiniteLengthForbidden),
            _ => return Err(CodecError::invalid_structure("reserved additional info")),
        };

        let argument = self
            .take(width)?
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));

        // Each width must carry a value that the next smaller one could not.
        let smallest = match width {
            1 => 24,
            2 => 0x100,
            4 => 0x1_0000,
            _ => 0x1_0000_0000,
        };
        if argument < smallest {
            return Err(CodecError::non_canonical());
        }
        Ok((major, argument))
    }

    fn bounded(len: u64, max: u64) -> CodecResult<usize> {
        usize::try_from(len)
            .ok()
            .filter(|_| len <= max)
            .ok_or(CodecError::SizeLimitExceeded {
                claimed: len,
                max_allowed: max,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::to_canonical_cbor;

    #[test]
    fn decodes_supported_items() {
        assert_eq!(from_cbor(&[0x40]).unwrap(), Value::Bytes(vec![]));
        assert_eq!(from_cbor(&[0x63, b'a', b'b', b'c']).unwrap(), Value::from("abc"));
        assert_eq!(
            from_cbor(&[0x82, 0x61, b'n', 0x42, 0, 1]).unwrap(),
            Value::Array(vec![Value::from("n"), Value::Bytes(vec![0, 1])])
        );
    }

    #[test]
    fn accepts_long_headers_when_needed() {
        let value = Value::Bytes(vec![9; 300]);
        let bytes = to_canonical_cbor(&value);
        assert_eq!(from_cbor(&bytes).unwrap(), value);
    }

    #[test]
    fn rejects_types_outside_key_subset() {
        // unsigned int, negative int, map, tag, null, half float
        for bytes in [&[0x05][..], &[0x20], &[0xa0], &[0xc0, 0x40], &[0xf6], &[0xf9, 0, 0]] {
            assert!(
                matches!(from_cbor(bytes), Err(CodecError::UnsupportedType { .. })),
                "{bytes:02x?}"
            );
        }
    }

    #[test]
    fn rejects_indefinite_lengths() {
        for bytes in [&[0x5f, 0x41, b'a', 0xff][..], &[0x7f, 0xff], &[0x9f, 0xff]] {
            assert_eq!(from_cbor(bytes), Err(CodecError::IndefiniteLengthForbidden));
        }
    }

    #[test]
    fn rejects_over_long_headers() {
        let cases: [&[u8]; 3] = [
            &[0x58, 0x05, 1, 2, 3, 4, 5],
            &[0x99, 0x00, 0x02, 0x40, 0x40],
            &[0x7a, 0x00, 0x00, 0x00, 0x01, b'x'],
        ];
        for bytes in cases {
            assert!(matches!(
                from_cbor(bytes),
                Err(CodecError::InvalidStructure { .. })
            ));
        }
    }

    #[test]
    fn rejects_oversized_arrays() {
        assert!(matches!(
            from_cbor(&[0x99, 0x04, 0x01]),
            Err(CodecError::SizeLimitExceeded {
                claimed: 1025,
                max_allowed: 1024
            })
        ));
    }

    #[test]
    fn rejects_deep_nesting_without_recursing_further() {
        let mut nested = vec![0x81u8; 64 * 1024];
        nested.push(0x40);
        assert_eq!(
            from_cbor(&nested),
            Err(CodecError::DepthLimitExceeded { max: MAX_DEPTH })
        );

        let mut shallow = vec![0x81u8; MAX_DEPTH];
        shallow.push(0x40);
        assert!(from_cbor(&shallow).is_ok());
    }

    #[test]
    fn truncated_and_trailing_input() {
        assert_eq!(from_cbor(&[]), Err(CodecError::UnexpectedEof));
        assert_eq!(from_cbor(&[0x59, 0x01]), Err(CodecError::UnexpectedEof));
        assert_eq!(from_cbor(&[0x82, 0x40]), Err(CodecError::UnexpectedEof));
        assert_eq!(
            from_cbor(&[0x40, 0x40]),
            Err(CodecError::TrailingBytes { remaining: 1 })
        );
    }

    #[test]
    fn text_must_be_utf8() {
        assert_eq!(from_cbor(&[0x61, 0xc3]), Err(CodecError::InvalidUtf8));
    }
}
