//! JSON <-> MessagePack document conversion.
//!
//! Diagnostic plumbing: lets tests and tooling state documents as JSON and
//! inspect binary documents readably. Binary payloads render as lowercase
//! hex strings, non-finite floats normalize to null, and extension types are
//! rejected (they have no JSON meaning). Not part of the wire contract.

use flowpack_error::{FlowpackError, Result};
use serde_json::{Map, Number, Value};

use crate::format::MsgPackType;
use crate::reader::MsgPackReader;
use crate::writer::MsgPackWriter;

/// Nesting cap for converted documents; conversion recurses and refuses to
/// follow deeper structures.
const MAX_DEPTH: usize = 128;

/// Encode a JSON value as a MessagePack document.
pub fn to_msgpack(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut w = MsgPackWriter::new(&mut buf);
    write_value(&mut w, value, 0)?;
    Ok(buf)
}

/// Decode a MessagePack document into a JSON value. The buffer must hold
/// exactly one value.
pub fn to_json(doc: &[u8]) -> Result<Value> {
    let mut r = MsgPackReader::new(doc);
    let value = read_value(&mut r, 0)?;
    if r.has_next() {
        return Err(FlowpackError::malformed(
            r.offset(),
            "trailing bytes after document",
        ));
    }
    Ok(value)
}

fn write_value(w: &mut MsgPackWriter<'_>, value: &Value, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(FlowpackError::unsupported("document nesting exceeds depth limit"));
    }
    match value {
        Value::Null => w.write_nil(),
        Value::Bool(b) => w.write_bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                w.write_integer(i);
            } else if n.is_u64() {
                return Err(FlowpackError::unsupported(format!(
                    "integer {n} above signed 64-bit range"
                )));
            } else if let Some(f) = n.as_f64() {
                w.write_float(f);
            }
        }
        Value::String(s) => w.write_str(s),
        Value::Array(items) => {
            w.write_array_header(items.len());
            for item in items {
                write_value(w, item, depth + 1)?;
            }
        }
        Value::Object(entries) => {
            w.write_map_header(entries.len());
            for (key, entry) in entries {
                w.write_str(key);
                write_value(w, entry, depth + 1)?;
            }
        }
    }
    Ok(())
}

fn read_value(r: &mut MsgPackReader<'_>, depth: usize) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(FlowpackError::unsupported("document nesting exceeds depth limit"));
    }
    Ok(match r.peek_type()? {
        MsgPackType::Nil => {
            r.read_nil()?;
            Value::Null
        }
        MsgPackType::Boolean => Value::Bool(r.read_bool()?),
        MsgPackType::Integer => Value::Number(r.read_integer()?.into()),
        MsgPackType::Float => Number::from_f64(r.read_float()?).map_or(Value::Null, Value::Number),
        MsgPackType::Str => Value::String(r.read_str()?.to_owned()),
        MsgPackType::Bin => Value::String(hex(r.read_bin()?)),
        MsgPackType::Array => {
            let count = r.read_array_header()?;
            let mut items = Vec::new();
            for _ in 0..count {
                items.push(read_value(r, depth + 1)?);
            }
            Value::Array(items)
        }
        MsgPackType::Map => {
            let count = r.read_map_header()?;
            let mut entries = Map::new();
            for _ in 0..count {
                let key = r.read_str()?.to_owned();
                entries.insert(key, read_value(r, depth + 1)?);
            }
            Value::Object(entries)
        }
        MsgPackType::Ext => {
            return Err(FlowpackError::unsupported("extension type in document"));
        }
    })
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}
