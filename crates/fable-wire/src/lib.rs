// SPDX-License-Identifier: Apache-2.0
//! Binary cursor primitives for the Fable story container format.
//!
//! All multi-byte integers are Little-Endian. Strings are length-prefixed:
//!
//! ```text
//! offset size  field
//! 0      4     byte_len = u32 LE
//! 4      N     UTF-8 payload (no terminator)
//! ```
//!
//! The cursor is version-agnostic: schema evolution (which fields exist at
//! which format version) is decided by the record codecs that drive it, not
//! by this layer. Every read failure reports the field being read and the
//! byte offset where the read started.

/// Maximum accepted string byte length (16 MiB) to prevent DoS via a
/// corrupted length prefix.
pub const MAX_STRING_LEN: u32 = 16 * 1024 * 1024;

/// Wire-level decode errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Input ended before the field could be read in full.
    #[error("truncated stream reading `{field}` at offset {offset}: need {needed} bytes, got {got}")]
    Truncated {
        /// Field being read when the stream ran out.
        field: &'static str,
        /// Offset where the read started.
        offset: usize,
        /// Bytes required to complete the read.
        needed: usize,
        /// Bytes actually available.
        got: usize,
    },

    /// String length prefix exceeds the sanity maximum.
    #[error("length prefix for `{field}` at offset {offset} is {len}, exceeds max {MAX_STRING_LEN}")]
    LengthOverflow {
        /// Field whose length prefix is out of range.
        field: &'static str,
        /// Offset of the length prefix.
        offset: usize,
        /// Declared length.
        len: u32,
    },

    /// String payload is not valid UTF-8.
    #[error("invalid UTF-8 in `{field}` at offset {offset}")]
    InvalidUtf8 {
        /// Field whose payload failed UTF-8 validation.
        field: &'static str,
        /// Offset of the payload start.
        offset: usize,
    },
}

/// Read cursor over a byte slice, tracking the current offset.
#[derive(Debug)]
pub struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor positioned at the start of `bytes`.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Current byte offset from the start of the input.
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes remaining after the current offset.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// True when the cursor has consumed the entire input.
    #[inline]
    pub const fn is_at_end(&self) -> bool {
        self.offset == self.bytes.len()
    }

    fn take(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < len {
            return Err(WireError::Truncated {
                field,
                offset: self.offset,
                needed: len,
                got: self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, WireError> {
        Ok(self.take(field, 1)?[0])
    }

    /// Read a u32 (LE).
    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, WireError> {
        let bytes = self.take(field, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self, field: &'static str) -> Result<String, WireError> {
        let prefix_offset = self.offset;
        let len = self.read_u32(field)?;
        if len > MAX_STRING_LEN {
            return Err(WireError::LengthOverflow {
                field,
                offset: prefix_offset,
                len,
            });
        }
        let payload_offset = self.offset;
        let payload = self.take(field, len as usize)?;
        String::from_utf8(payload.to_vec()).map_err(|_| WireError::InvalidUtf8 {
            field,
            offset: payload_offset,
        })
    }
}

/// Append-only writer mirroring [`Cursor`].
#[derive(Debug, Default)]
pub struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    /// Create an empty writer.
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when nothing has been written yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    /// Write a u32 (LE).
    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) {
        self.write_u32(value.len() as u32);
        self.bytes.extend_from_slice(value.as_bytes());
    }

    /// Consume the writer, yielding the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
