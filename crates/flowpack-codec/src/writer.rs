//! Token writer: appends canonical MessagePack tokens to a caller-supplied
//! buffer.
//!
//! Writes are infallible; the only failure mode is a payload above the
//! 32-bit wire length limit, which panics (such a value cannot be produced
//! by a well-formed document and has no encoding at all). Integers are
//! written at their smallest canonical width so output matches the lengths
//! reported by the helpers in [`crate::format`] byte for byte.

use crate::format::marker;

/// Appending writer over a `Vec<u8>`.
#[derive(Debug)]
pub struct MsgPackWriter<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> MsgPackWriter<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        Self { buf }
    }

    /// Current write position (bytes in the underlying buffer).
    #[must_use]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn write_nil(&mut self) {
        self.buf.push(marker::NIL);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(if value { marker::TRUE } else { marker::FALSE });
    }

    /// Write an integer at its smallest canonical width: non-negative values
    /// through the fixint/uint family, negative through fixint/int.
    pub fn write_integer(&mut self, value: i64) {
        if value >= 0 {
            if value < 1 << 7 {
                self.buf.push(value as u8);
            } else if value <= i64::from(u8::MAX) {
                self.buf.push(marker::UINT8);
                self.buf.push(value as u8);
            } else if value <= i64::from(u16::MAX) {
                self.buf.push(marker::UINT16);
                self.buf.extend_from_slice(&(value as u16).to_be_bytes());
            } else if value <= i64::from(u32::MAX) {
                self.buf.push(marker::UINT32);
                self.buf.extend_from_slice(&(value as u32).to_be_bytes());
            } else {
                self.buf.push(marker::UINT64);
                self.buf.extend_from_slice(&(value as u64).to_be_bytes());
            }
        } else if value >= -32 {
            self.buf.push(value as i8 as u8);
        } else if value >= i64::from(i8::MIN) {
            self.buf.push(marker::INT8);
            self.buf.push(value as i8 as u8);
        } else if value >= i64::from(i16::MIN) {
            self.buf.push(marker::INT16);
            self.buf.extend_from_slice(&(value as i16).to_be_bytes());
        } else if value >= i64::from(i32::MIN) {
            self.buf.push(marker::INT32);
            self.buf.extend_from_slice(&(value as i32).to_be_bytes());
        } else {
            self.buf.push(marker::INT64);
            self.buf.extend_from_slice(&value.to_be_bytes());
        }
    }

    /// Write a float, always at 64-bit width.
    pub fn write_float(&mut self, value: f64) {
        self.buf.push(marker::FLOAT64);
        self.buf.extend_from_slice(&value.to_bits().to_be_bytes());
    }

    /// Write a string token.
    ///
    /// # Panics
    /// If the UTF-8 payload exceeds the 32-bit wire length limit.
    pub fn write_str(&mut self, value: &str) {
        let len = value.len();
        if len < 32 {
            self.buf.push(marker::FIXSTR_MIN | len as u8);
        } else if len <= u8::MAX as usize {
            self.buf.push(marker::STR8);
            self.buf.push(len as u8);
        } else if len <= u16::MAX as usize {
            self.buf.push(marker::STR16);
            self.buf.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            assert!(len <= u32::MAX as usize, "string exceeds wire length limit");
            self.buf.push(marker::STR32);
            self.buf.extend_from_slice(&(len as u32).to_be_bytes());
        }
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Write a binary token.
    ///
    /// # Panics
    /// If the payload exceeds the 32-bit wire length limit.
    pub fn write_bin(&mut self, value: &[u8]) {
        let len = value.len();
        if len <= u8::MAX as usize {
            self.buf.push(marker::BIN8);
            self.buf.push(len as u8);
        } else if len <= u16::MAX as usize {
            self.buf.push(marker::BIN16);
            self.buf.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            assert!(len <= u32::MAX as usize, "binary exceeds wire length limit");
            self.buf.push(marker::BIN32);
            self.buf.extend_from_slice(&(len as u32).to_be_bytes());
        }
        self.buf.extend_from_slice(value);
    }

    /// Write a map header for `count` entries; the caller then writes
    /// `count` key/value pairs.
    ///
    /// # Panics
    /// If the count exceeds the 32-bit wire limit.
    pub fn write_map_header(&mut self, count: usize) {
        if count < 16 {
            self.buf.push(marker::FIXMAP_MIN | count as u8);
        } else if count <= u16::MAX as usize {
            self.buf.push(marker::MAP16);
            self.buf.extend_from_slice(&(count as u16).to_be_bytes());
        } else {
            assert!(count <= u32::MAX as usize, "map exceeds wire entry limit");
            self.buf.push(marker::MAP32);
            self.buf.extend_from_slice(&(count as u32).to_be_bytes());
        }
    }

    /// Write an array header for `count` elements.
    ///
    /// # Panics
    /// If the count exceeds the 32-bit wire limit.
    pub fn write_array_header(&mut self, count: usize) {
        if count < 16 {
            self.buf.push(marker::FIXARRAY_MIN | count as u8);
        } else if count <= u16::MAX as usize {
            self.buf.push(marker::ARRAY16);
            self.buf.extend_from_slice(&(count as u16).to_be_bytes());
        } else {
            assert!(count <= u32::MAX as usize, "array exceeds wire element limit");
            self.buf.push(marker::ARRAY32);
            self.buf.extend_from_slice(&(count as u32).to_be_bytes());
        }
    }

    /// Append pre-encoded bytes verbatim. The caller guarantees they form
    /// whole values.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}
