//! Token reader: a cursor over a byte buffer that consumes MessagePack
//! tokens one at a time.
//!
//! Every typed read validates the marker at the cursor and fails with an
//! offset-carrying error on a mismatch; the cursor is not advanced past the
//! point of failure in a recoverable way, so a failed read poisons the
//! decode (callers reset and report). `skip_value` walks exactly one value
//! of any kind, including nested containers and foreign extension types, and
//! returns its raw span for verbatim capture.

use flowpack_error::{FlowpackError, Result};

use crate::format::{MsgPackType, marker};

/// Cursor over a MessagePack-encoded buffer.
#[derive(Debug)]
pub struct MsgPackReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> MsgPackReader<'a> {
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Current byte offset from the start of the buffer.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left to consume.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Whether at least one more byte is available.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.offset < self.buf.len()
    }

    /// Kind of the token at the cursor, without consuming it.
    pub fn peek_type(&self) -> Result<MsgPackType> {
        let m = self.peek_marker()?;
        MsgPackType::of(m)
            .ok_or_else(|| FlowpackError::malformed(self.offset, format!("reserved marker {m:#04x}")))
    }

    /// Consume a nil token.
    pub fn read_nil(&mut self) -> Result<()> {
        let at = self.offset;
        let m = self.take_marker()?;
        if m == marker::NIL {
            Ok(())
        } else {
            Err(self.mismatch(at, "nil", m))
        }
    }

    /// Consume a boolean token.
    pub fn read_bool(&mut self) -> Result<bool> {
        let at = self.offset;
        match self.take_marker()? {
            marker::FALSE => Ok(false),
            marker::TRUE => Ok(true),
            m => Err(self.mismatch(at, "boolean", m)),
        }
    }

    /// Consume an integer token of any canonical width.
    ///
    /// Unsigned 64-bit values above `i64::MAX` are rejected: the value model
    /// is signed throughout, as in the original wire contract.
    pub fn read_integer(&mut self) -> Result<i64> {
        let at = self.offset;
        match self.take_marker()? {
            m @ 0x00..=0x7f => Ok(i64::from(m)),
            m @ 0xe0..=0xff => Ok(i64::from(m as i8)),
            marker::UINT8 => Ok(i64::from(self.take_u8()?)),
            marker::UINT16 => Ok(i64::from(self.take_u16()?)),
            marker::UINT32 => Ok(i64::from(self.take_u32()?)),
            marker::UINT64 => {
                let v = self.take_u64()?;
                i64::try_from(v).map_err(|_| FlowpackError::IntegerOutOfRange {
                    value: i128::from(v),
                    width: "i64",
                })
            }
            marker::INT8 => Ok(i64::from(self.take_u8()? as i8)),
            marker::INT16 => Ok(i64::from(self.take_u16()? as i16)),
            marker::INT32 => Ok(i64::from(self.take_u32()? as i32)),
            marker::INT64 => Ok(self.take_u64()? as i64),
            m => Err(self.mismatch(at, "integer", m)),
        }
    }

    /// Consume a float token (either width), widening float32 to f64.
    pub fn read_float(&mut self) -> Result<f64> {
        let at = self.offset;
        match self.take_marker()? {
            marker::FLOAT32 => Ok(f64::from(f32::from_bits(self.take_u32()?))),
            marker::FLOAT64 => Ok(f64::from_bits(self.take_u64()?)),
            m => Err(self.mismatch(at, "float", m)),
        }
    }

    /// Consume a string token and return its UTF-8 payload.
    pub fn read_str(&mut self) -> Result<&'a str> {
        let at = self.offset;
        let len = match self.take_marker()? {
            m @ marker::FIXSTR_MIN..=marker::FIXSTR_MAX => (m & 0x1f) as usize,
            marker::STR8 => self.take_u8()? as usize,
            marker::STR16 => self.take_u16()? as usize,
            marker::STR32 => self.take_u32()? as usize,
            m => return Err(self.mismatch(at, "string", m)),
        };
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map_err(|_| FlowpackError::malformed(at, "string payload is not valid UTF-8"))
    }

    /// Consume a binary token and return its payload.
    pub fn read_bin(&mut self) -> Result<&'a [u8]> {
        let at = self.offset;
        let len = match self.take_marker()? {
            marker::BIN8 => self.take_u8()? as usize,
            marker::BIN16 => self.take_u16()? as usize,
            marker::BIN32 => self.take_u32()? as usize,
            m => return Err(self.mismatch(at, "binary", m)),
        };
        self.take(len)
    }

    /// Consume a map header and return its entry count.
    pub fn read_map_header(&mut self) -> Result<usize> {
        let at = self.offset;
        match self.take_marker()? {
            m @ marker::FIXMAP_MIN..=marker::FIXMAP_MAX => Ok((m & 0x0f) as usize),
            marker::MAP16 => Ok(self.take_u16()? as usize),
            marker::MAP32 => Ok(self.take_u32()? as usize),
            m => Err(self.mismatch(at, "map header", m)),
        }
    }

    /// Consume an array header and return its element count.
    pub fn read_array_header(&mut self) -> Result<usize> {
        let at = self.offset;
        match self.take_marker()? {
            m @ marker::FIXARRAY_MIN..=marker::FIXARRAY_MAX => Ok((m & 0x0f) as usize),
            marker::ARRAY16 => Ok(self.take_u16()? as usize),
            marker::ARRAY32 => Ok(self.take_u32()? as usize),
            m => Err(self.mismatch(at, "array header", m)),
        }
    }

    /// Skip exactly one value of any kind and return its raw byte span.
    ///
    /// Containers are walked with an element count-down rather than
    /// recursion, so nesting depth is bounded only by the buffer.
    pub fn skip_value(&mut self) -> Result<&'a [u8]> {
        let start = self.offset;
        let mut pending: usize = 1;
        while pending > 0 {
            pending -= 1;
            let at = self.offset;
            match self.take_marker()? {
                0x00..=0x7f | 0xe0..=0xff | marker::NIL | marker::FALSE | marker::TRUE => {}
                m @ marker::FIXMAP_MIN..=marker::FIXMAP_MAX => {
                    pending = pending.saturating_add(2 * (m & 0x0f) as usize);
                }
                m @ marker::FIXARRAY_MIN..=marker::FIXARRAY_MAX => {
                    pending = pending.saturating_add((m & 0x0f) as usize);
                }
                m @ marker::FIXSTR_MIN..=marker::FIXSTR_MAX => {
                    self.take((m & 0x1f) as usize)?;
                }
                marker::UINT8 | marker::INT8 => {
                    self.take(1)?;
                }
                marker::UINT16 | marker::INT16 => {
                    self.take(2)?;
                }
                marker::UINT32 | marker::INT32 | marker::FLOAT32 => {
                    self.take(4)?;
                }
                marker::UINT64 | marker::INT64 | marker::FLOAT64 => {
                    self.take(8)?;
                }
                marker::STR8 | marker::BIN8 => {
                    let n = self.take_u8()? as usize;
                    self.take(n)?;
                }
                marker::STR16 | marker::BIN16 => {
                    let n = self.take_u16()? as usize;
                    self.take(n)?;
                }
                marker::STR32 | marker::BIN32 => {
                    let n = self.take_u32()? as usize;
                    self.take(n)?;
                }
                marker::ARRAY16 => {
                    let n = self.take_u16()? as usize;
                    pending = pending.saturating_add(n);
                }
                marker::ARRAY32 => {
                    let n = self.take_u32()? as usize;
                    pending = pending.saturating_add(n);
                }
                marker::MAP16 => {
                    let n = self.take_u16()? as usize;
                    pending = pending.saturating_add(n.saturating_mul(2));
                }
                marker::MAP32 => {
                    let n = self.take_u32()? as usize;
                    pending = pending.saturating_add(n.saturating_mul(2));
                }
                // fixext: one type byte plus the fixed payload
                marker::FIXEXT1 => {
                    self.take(2)?;
                }
                marker::FIXEXT2 => {
                    self.take(3)?;
                }
                marker::FIXEXT4 => {
                    self.take(5)?;
                }
                marker::FIXEXT8 => {
                    self.take(9)?;
                }
                marker::FIXEXT16 => {
                    self.take(17)?;
                }
                marker::EXT8 => {
                    let n = self.take_u8()? as usize;
                    self.take(n.saturating_add(1))?;
                }
                marker::EXT16 => {
                    let n = self.take_u16()? as usize;
                    self.take(n.saturating_add(1))?;
                }
                marker::EXT32 => {
                    let n = self.take_u32()? as usize;
                    self.take(n.saturating_add(1))?;
                }
                m @ marker::RESERVED => {
                    return Err(FlowpackError::malformed(at, format!("reserved marker {m:#04x}")));
                }
            }
        }
        Ok(&self.buf[start..self.offset])
    }

    // -----------------------------------------------------------------------
    // Raw cursor primitives
    // -----------------------------------------------------------------------

    fn peek_marker(&self) -> Result<u8> {
        self.buf.get(self.offset).copied().ok_or(FlowpackError::Truncated {
            offset: self.offset,
            needed: 1,
            available: 0,
        })
    }

    fn take_marker(&mut self) -> Result<u8> {
        let m = self.peek_marker()?;
        self.offset += 1;
        Ok(m)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(FlowpackError::Truncated {
                offset: self.offset,
                needed: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(bytes)
    }

    fn take_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn take_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn take_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn mismatch(&self, at: usize, expected: &'static str, m: u8) -> FlowpackError {
        match MsgPackType::of(m) {
            Some(t) => FlowpackError::unexpected(at, expected, t.name()),
            None => FlowpackError::malformed(at, format!("reserved marker {m:#04x}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_every_integer_width() {
        // (encoding, value)
        let cases: &[(&[u8], i64)] = &[
            (&[0x00], 0),
            (&[0x7f], 127),
            (&[0xcc, 0x80], 128),
            (&[0xcc, 0xff], 255),
            (&[0xcd, 0x01, 0x00], 256),
            (&[0xcd, 0xff, 0xff], 65535),
            (&[0xce, 0x00, 0x01, 0x00, 0x00], 65536),
            (&[0xce, 0xff, 0xff, 0xff, 0xff], u32::MAX as i64),
            (
                &[0xcf, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00],
                u32::MAX as i64 + 1,
            ),
            (
                &[0xcf, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
                i64::MAX,
            ),
            (&[0xff], -1),
            (&[0xe0], -32),
            (&[0xd0, 0xdf], -33),
            (&[0xd0, 0x80], -128),
            (&[0xd1, 0xff, 0x7f], -129),
            (&[0xd1, 0x80, 0x00], -32768),
            (&[0xd2, 0xff, 0xff, 0x7f, 0xff], -32769),
            (&[0xd2, 0x80, 0x00, 0x00, 0x00], i32::MIN as i64),
            (
                &[0xd3, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
                i64::MIN,
            ),
        ];
        for &(bytes, expected) in cases {
            let mut r = MsgPackReader::new(bytes);
            assert_eq!(r.read_integer().unwrap(), expected, "bytes {bytes:02x?}");
            assert_eq!(r.remaining(), 0);
        }
    }

    #[test]
    fn uint64_above_i64_max_is_out_of_range() {
        let bytes = [0xcf, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let mut r = MsgPackReader::new(&bytes);
        let err = r.read_integer().unwrap_err();
        assert!(matches!(
            err,
            FlowpackError::IntegerOutOfRange { width: "i64", .. }
        ));
    }

    #[test]
    fn reads_bool_and_nil() {
        let mut r = MsgPackReader::new(&[0xc3, 0xc2, 0xc0]);
        assert!(r.read_bool().unwrap());
        assert!(!r.read_bool().unwrap());
        r.read_nil().unwrap();
        assert!(!r.has_next());
    }

    #[test]
    fn reads_float_both_widths() {
        let mut buf = vec![0xca];
        buf.extend_from_slice(&2.5f32.to_bits().to_be_bytes());
        buf.push(0xcb);
        buf.extend_from_slice(&(-0.125f64).to_bits().to_be_bytes());
        let mut r = MsgPackReader::new(&buf);
        assert_eq!(r.read_float().unwrap(), 2.5);
        assert_eq!(r.read_float().unwrap(), -0.125);
    }

    #[test]
    fn reads_str_widths() {
        // fixstr
        let mut r = MsgPackReader::new(&[0xa3, b'f', b'o', b'o']);
        assert_eq!(r.read_str().unwrap(), "foo");

        // str8
        let mut buf = vec![0xd9, 32];
        buf.extend_from_slice(&[b'x'; 32]);
        let mut r = MsgPackReader::new(&buf);
        assert_eq!(r.read_str().unwrap().len(), 32);

        // str16
        let mut buf = vec![0xda, 0x01, 0x00];
        buf.extend_from_slice(&[b'y'; 256]);
        let mut r = MsgPackReader::new(&buf);
        assert_eq!(r.read_str().unwrap().len(), 256);
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let mut r = MsgPackReader::new(&[0xa2, 0xff, 0xfe]);
        let err = r.read_str().unwrap_err();
        assert!(matches!(err, FlowpackError::Malformed { offset: 0, .. }));
    }

    #[test]
    fn wrong_marker_reports_expected_and_actual() {
        let mut r = MsgPackReader::new(&[0x80]);
        let err = r.read_str().unwrap_err();
        let FlowpackError::UnexpectedType {
            offset,
            expected,
            actual,
        } = err
        else {
            panic!("expected UnexpectedType, got {err}");
        };
        assert_eq!(offset, 0);
        assert_eq!(expected, "string");
        assert_eq!(actual, "map header");
    }

    #[test]
    fn truncated_payload_reports_offset() {
        // str8 claiming 5 bytes with only 2 present
        let mut r = MsgPackReader::new(&[0xd9, 0x05, b'a', b'b']);
        let err = r.read_str().unwrap_err();
        let FlowpackError::Truncated {
            offset,
            needed,
            available,
        } = err
        else {
            panic!("expected Truncated, got {err}");
        };
        assert_eq!(offset, 2);
        assert_eq!(needed, 5);
        assert_eq!(available, 2);
    }

    #[test]
    fn reserved_marker_is_malformed() {
        let mut r = MsgPackReader::new(&[0xc1]);
        let err = r.read_integer().unwrap_err();
        assert!(matches!(err, FlowpackError::Malformed { offset: 0, .. }));
        assert!(err.to_string().contains("0xc1"));
    }

    #[test]
    fn skip_scalar_returns_span() {
        let mut r = MsgPackReader::new(&[0xcd, 0x01, 0x00, 0xc3]);
        assert_eq!(r.skip_value().unwrap(), &[0xcd, 0x01, 0x00]);
        assert_eq!(r.offset(), 3);
    }

    #[test]
    fn skip_nested_containers() {
        // {"a": [1, {"b": nil}], "c": "xy"}
        let doc: &[u8] = &[
            0x82, // map, 2 entries
            0xa1, b'a', // "a"
            0x92, // array, 2 elements
            0x01, // 1
            0x81, 0xa1, b'b', 0xc0, // {"b": nil}
            0xa1, b'c', // "c"
            0xa2, b'x', b'y', // "xy"
        ];
        let mut r = MsgPackReader::new(doc);
        assert_eq!(r.skip_value().unwrap(), doc);
        assert!(!r.has_next());
    }

    #[test]
    fn skip_foreign_extension_types() {
        // fixext4 (type 0x05) then ext8 with 3 payload bytes
        let doc: &[u8] = &[
            0xd6, 0x05, 1, 2, 3, 4, // fixext4
            0xc7, 0x03, 0x06, 9, 8, 7, // ext8, len 3, type 6
        ];
        let mut r = MsgPackReader::new(doc);
        assert_eq!(r.skip_value().unwrap(), &doc[..6]);
        assert_eq!(r.skip_value().unwrap(), &doc[6..]);
        assert!(!r.has_next());
    }

    #[test]
    fn skip_truncated_container_fails() {
        // map claims 2 entries, only one present
        let mut r = MsgPackReader::new(&[0x82, 0xa1, b'a', 0x01]);
        assert!(r.skip_value().is_err());
    }

    #[test]
    fn peek_type_does_not_consume() {
        let mut r = MsgPackReader::new(&[0x93, 0x01, 0x02, 0x03]);
        assert_eq!(r.peek_type().unwrap(), MsgPackType::Array);
        assert_eq!(r.offset(), 0);
        assert_eq!(r.read_array_header().unwrap(), 3);
    }

    #[test]
    fn map_header_widths() {
        let mut r = MsgPackReader::new(&[0x8f]);
        assert_eq!(r.read_map_header().unwrap(), 15);
        let mut r = MsgPackReader::new(&[0xde, 0x00, 0x10]);
        assert_eq!(r.read_map_header().unwrap(), 16);
        let mut r = MsgPackReader::new(&[0xdf, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(r.read_map_header().unwrap(), 65536);
    }
}
