//! MessagePack wire-format constants and canonical-length helpers.
//!
//! Marker byte layout, per the MessagePack spec
//! (<https://github.com/msgpack/msgpack/blob/master/spec.md>):
//!
//! | Marker        | Range/Value | Meaning                          |
//! |---------------|-------------|----------------------------------|
//! | pos. fixint   | 0x00..=0x7f | integer 0..=127, inline          |
//! | fixmap        | 0x80..=0x8f | map, 0..=15 entries              |
//! | fixarray      | 0x90..=0x9f | array, 0..=15 elements           |
//! | fixstr        | 0xa0..=0xbf | string, 0..=31 bytes             |
//! | nil           | 0xc0        | nil                              |
//! | (reserved)    | 0xc1        | never used; malformed input      |
//! | false / true  | 0xc2 / 0xc3 | boolean                          |
//! | bin 8/16/32   | 0xc4..=0xc6 | binary, length-prefixed          |
//! | ext 8/16/32   | 0xc7..=0xc9 | extension, length-prefixed       |
//! | float 32/64   | 0xca / 0xcb | IEEE 754                         |
//! | uint 8..64    | 0xcc..=0xcf | unsigned integer, big-endian     |
//! | int 8..64     | 0xd0..=0xd3 | signed integer, big-endian       |
//! | fixext 1..16  | 0xd4..=0xd8 | extension, fixed payload         |
//! | str 8/16/32   | 0xd9..=0xdb | string, length-prefixed          |
//! | array 16/32   | 0xdc / 0xdd | array, count-prefixed            |
//! | map 16/32     | 0xde / 0xdf | map, count-prefixed              |
//! | neg. fixint   | 0xe0..=0xff | integer -32..=-1, inline         |
//!
//! Writers in this crate always emit the smallest canonical width for a
//! value; readers accept any canonical width. Extension types are never
//! produced but are recognized so foreign values can be skipped over.

/// Canonical empty document: a map with zero entries.
pub const EMPTY_DOCUMENT: &[u8] = &[marker::FIXMAP_MIN];

/// Encoded nil value.
pub const NIL_VALUE: &[u8] = &[marker::NIL];

/// Marker byte constants.
pub mod marker {
    pub const FIXMAP_MIN: u8 = 0x80;
    pub const FIXMAP_MAX: u8 = 0x8f;
    pub const FIXARRAY_MIN: u8 = 0x90;
    pub const FIXARRAY_MAX: u8 = 0x9f;
    pub const FIXSTR_MIN: u8 = 0xa0;
    pub const FIXSTR_MAX: u8 = 0xbf;
    pub const NIL: u8 = 0xc0;
    pub const RESERVED: u8 = 0xc1;
    pub const FALSE: u8 = 0xc2;
    pub const TRUE: u8 = 0xc3;
    pub const BIN8: u8 = 0xc4;
    pub const BIN16: u8 = 0xc5;
    pub const BIN32: u8 = 0xc6;
    pub const EXT8: u8 = 0xc7;
    pub const EXT16: u8 = 0xc8;
    pub const EXT32: u8 = 0xc9;
    pub const FLOAT32: u8 = 0xca;
    pub const FLOAT64: u8 = 0xcb;
    pub const UINT8: u8 = 0xcc;
    pub const UINT16: u8 = 0xcd;
    pub const UINT32: u8 = 0xce;
    pub const UINT64: u8 = 0xcf;
    pub const INT8: u8 = 0xd0;
    pub const INT16: u8 = 0xd1;
    pub const INT32: u8 = 0xd2;
    pub const INT64: u8 = 0xd3;
    pub const FIXEXT1: u8 = 0xd4;
    pub const FIXEXT2: u8 = 0xd5;
    pub const FIXEXT4: u8 = 0xd6;
    pub const FIXEXT8: u8 = 0xd7;
    pub const FIXEXT16: u8 = 0xd8;
    pub const STR8: u8 = 0xd9;
    pub const STR16: u8 = 0xda;
    pub const STR32: u8 = 0xdb;
    pub const ARRAY16: u8 = 0xdc;
    pub const ARRAY32: u8 = 0xdd;
    pub const MAP16: u8 = 0xde;
    pub const MAP32: u8 = 0xdf;
    pub const NEG_FIXINT_MIN: u8 = 0xe0;
}

/// Token kind a marker byte announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgPackType {
    Nil,
    Boolean,
    Integer,
    Float,
    Str,
    Bin,
    Array,
    Map,
    Ext,
}

impl MsgPackType {
    /// Classify a marker byte. Returns `None` for the reserved marker 0xc1.
    #[must_use]
    pub const fn of(marker_byte: u8) -> Option<Self> {
        Some(match marker_byte {
            0x00..=0x7f | 0xcc..=0xcf | 0xd0..=0xd3 | 0xe0..=0xff => Self::Integer,
            0x80..=0x8f | 0xde | 0xdf => Self::Map,
            0x90..=0x9f | 0xdc | 0xdd => Self::Array,
            0xa0..=0xbf | 0xd9..=0xdb => Self::Str,
            marker::NIL => Self::Nil,
            marker::RESERVED => return None,
            marker::FALSE | marker::TRUE => Self::Boolean,
            0xc4..=0xc6 => Self::Bin,
            0xc7..=0xc9 | 0xd4..=0xd8 => Self::Ext,
            marker::FLOAT32 | marker::FLOAT64 => Self::Float,
        })
    }

    /// Short name for error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Str => "string",
            Self::Bin => "binary",
            Self::Array => "array header",
            Self::Map => "map header",
            Self::Ext => "extension",
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical encoded lengths
// ---------------------------------------------------------------------------
//
// Each helper returns exactly the byte count the writer produces for the
// same input, so container lengths can be computed in a first pass before a
// single byte is written.

/// Encoded length of an integer at its smallest canonical width.
#[must_use]
pub const fn integer_len(value: i64) -> usize {
    if value >= 0 {
        if value < 1 << 7 {
            1
        } else if value <= u8::MAX as i64 {
            2
        } else if value <= u16::MAX as i64 {
            3
        } else if value <= u32::MAX as i64 {
            5
        } else {
            9
        }
    } else if value >= -32 {
        1
    } else if value >= i8::MIN as i64 {
        2
    } else if value >= i16::MIN as i64 {
        3
    } else if value >= i32::MIN as i64 {
        5
    } else {
        9
    }
}

/// Encoded length of a string with the given UTF-8 byte length.
#[must_use]
pub const fn str_len(byte_len: usize) -> usize {
    let header = if byte_len < 32 {
        1
    } else if byte_len <= u8::MAX as usize {
        2
    } else if byte_len <= u16::MAX as usize {
        3
    } else {
        5
    };
    header + byte_len
}

/// Encoded length of a binary blob with the given byte length.
#[must_use]
pub const fn bin_len(byte_len: usize) -> usize {
    let header = if byte_len <= u8::MAX as usize {
        2
    } else if byte_len <= u16::MAX as usize {
        3
    } else {
        5
    };
    header + byte_len
}

/// Encoded length of a map header for the given entry count.
#[must_use]
pub const fn map_header_len(count: usize) -> usize {
    if count < 16 {
        1
    } else if count <= u16::MAX as usize {
        3
    } else {
        5
    }
}

/// Encoded length of an array header for the given element count.
#[must_use]
pub const fn array_header_len(count: usize) -> usize {
    if count < 16 {
        1
    } else if count <= u16::MAX as usize {
        3
    } else {
        5
    }
}

/// Encoded length of a boolean.
pub const BOOL_LEN: usize = 1;

/// Encoded length of nil.
pub const NIL_LEN: usize = 1;

/// Encoded length of a float (always written as float64).
pub const FLOAT_LEN: usize = 9;
