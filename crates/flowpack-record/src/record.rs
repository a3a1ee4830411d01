//! Structured record: a fixed set of declared, typed properties plus
//! verbatim passthrough of whatever else the wire carried.
//!
//! Declaration happens once through [`RecordBuilder`]; each declaration
//! returns a [`PropertyId`] handle for typed access afterwards. Decoding
//! replaces the record's state wholesale: declared fields decode into their
//! properties, unknown fields are captured byte-for-byte and re-emitted on
//! encode, so two deployments with different declarations can pass the same
//! document back and forth without shedding or inflating data.

use flowpack_codec::format;
use flowpack_codec::{MsgPackReader, MsgPackWriter};
use flowpack_error::{FlowpackError, Result};

use crate::array::ArrayValue;
use crate::value::{
    BinaryValue, BoolValue, DocumentValue, EnumValue, Int32Value, Int64Value, StringValue, Value,
};

/// Handle for one declared property, issued by [`RecordBuilder`].
///
/// A handle is only meaningful against the record (or clones of the record)
/// whose builder issued it; using it elsewhere is a call-site bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Property {
    name: String,
    value: Value,
}

/// A field the wire carried that no declaration matched. `raw` is the
/// encoded value exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UndeclaredField {
    name: String,
    raw: Vec<u8>,
}

/// Declares properties for a [`Record`]. Declaration order is encode order.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    properties: Vec<Property>,
}

impl RecordBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics when `name` was already declared.
    fn declare(&mut self, name: &str, value: Value) -> PropertyId {
        assert!(
            self.properties.iter().all(|p| p.name != name),
            "property '{name}' declared twice"
        );
        let id = PropertyId(self.properties.len());
        self.properties.push(Property {
            name: name.to_owned(),
            value,
        });
        id
    }

    pub fn int32(&mut self, name: &str) -> PropertyId {
        self.declare(name, Int32Value::new().into())
    }

    pub fn int32_with_default(&mut self, name: &str, default: i32) -> PropertyId {
        self.declare(name, Int32Value::with_default(default).into())
    }

    pub fn int64(&mut self, name: &str) -> PropertyId {
        self.declare(name, Int64Value::new().into())
    }

    pub fn int64_with_default(&mut self, name: &str, default: i64) -> PropertyId {
        self.declare(name, Int64Value::with_default(default).into())
    }

    pub fn boolean(&mut self, name: &str) -> PropertyId {
        self.declare(name, BoolValue::new().into())
    }

    pub fn boolean_with_default(&mut self, name: &str, default: bool) -> PropertyId {
        self.declare(name, BoolValue::with_default(default).into())
    }

    pub fn string(&mut self, name: &str) -> PropertyId {
        self.declare(name, StringValue::new().into())
    }

    pub fn string_with_default(&mut self, name: &str, default: impl Into<String>) -> PropertyId {
        self.declare(name, StringValue::with_default(default).into())
    }

    pub fn binary(&mut self, name: &str) -> PropertyId {
        self.declare(name, BinaryValue::new().into())
    }

    pub fn binary_with_default(&mut self, name: &str, default: &[u8]) -> PropertyId {
        self.declare(name, BinaryValue::with_default(default).into())
    }

    /// Enum stored as its constant's name; the first constant is the
    /// default.
    pub fn enumeration(&mut self, name: &str, constants: &[&str]) -> PropertyId {
        self.declare(name, EnumValue::new(constants).into())
    }

    /// # Panics
    ///
    /// Panics when `default` names no constant.
    pub fn enumeration_with_default(
        &mut self,
        name: &str,
        constants: &[&str],
        default: &str,
    ) -> PropertyId {
        self.declare(name, EnumValue::with_default(constants, default).into())
    }

    /// Opaque embedded document, carried as raw map bytes.
    pub fn document(&mut self, name: &str) -> PropertyId {
        self.declare(name, DocumentValue::new().into())
    }

    /// Nested record with its own declared schema.
    pub fn object(&mut self, name: &str, nested: Record) -> PropertyId {
        self.declare(name, nested.into())
    }

    /// Repeated-element container; `prototype` fixes the element type.
    pub fn array(&mut self, name: &str, prototype: impl Into<Value>) -> PropertyId {
        self.declare(name, ArrayValue::new(prototype).into())
    }

    #[must_use]
    pub fn build(self) -> Record {
        Record {
            properties: self.properties,
            undeclared: Vec::new(),
        }
    }
}

/// Reusable structured message. See the module docs for the decode and
/// passthrough contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    properties: Vec<Property>,
    undeclared: Vec<UndeclaredField>,
}

impl Record {
    #[must_use]
    pub fn builder() -> RecordBuilder {
        RecordBuilder::new()
    }

    /// Decode `buf` as this record, replacing all previous state. The whole
    /// buffer must be one document; trailing bytes are malformed. On error
    /// the record is left fully reset.
    pub fn wrap(&mut self, buf: &[u8]) -> Result<()> {
        let mut r = MsgPackReader::new(buf);
        let result = self.read(&mut r).and_then(|()| {
            if r.has_next() {
                Err(FlowpackError::malformed(
                    r.offset(),
                    "trailing bytes after document",
                ))
            } else {
                Ok(())
            }
        });
        if result.is_err() {
            self.reset();
        }
        result
    }

    pub(crate) fn read(&mut self, r: &mut MsgPackReader<'_>) -> Result<()> {
        self.reset();
        let fields = r.read_map_header()?;
        for _ in 0..fields {
            let name = r.read_str()?;
            let slot = self.properties.iter().position(|p| p.name == name);
            match slot {
                Some(i) => {
                    let prop = &mut self.properties[i];
                    prop.value
                        .read(r)
                        .map_err(|e| FlowpackError::property(&prop.name, e))?;
                }
                None => {
                    let raw = r.skip_value()?.to_vec();
                    self.undeclared.push(UndeclaredField {
                        name: name.to_owned(),
                        raw,
                    });
                }
            }
        }
        Ok(())
    }

    pub(crate) fn write(&self, w: &mut MsgPackWriter<'_>) {
        w.write_map_header(self.properties.len() + self.undeclared.len());
        for p in &self.properties {
            w.write_str(&p.name);
            p.value.write(w);
        }
        for f in &self.undeclared {
            w.write_str(&f.name);
            w.write_raw(&f.raw);
        }
    }

    /// Append the encoding to `buf`.
    pub fn write_into(&self, buf: &mut Vec<u8>) {
        let mut w = MsgPackWriter::new(buf);
        self.write(&mut w);
    }

    /// Encode into a fresh buffer sized by [`Record::encoded_len`].
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.write_into(&mut buf);
        buf
    }

    /// Exact byte count `write` will produce for the current state.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let mut len = format::map_header_len(self.properties.len() + self.undeclared.len());
        for p in &self.properties {
            len += format::str_len(p.name.len()) + p.value.encoded_len();
        }
        for f in &self.undeclared {
            len += format::str_len(f.name.len()) + f.raw.len();
        }
        len
    }

    /// Return every declared property to its default and drop all
    /// undeclared fields.
    pub fn reset(&mut self) {
        for p in &mut self.properties {
            p.value.reset();
        }
        self.undeclared.clear();
    }

    /// Undeclared fields captured by the last decode, in wire order, as
    /// `(field name, raw encoded value)`.
    pub fn undeclared(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.undeclared
            .iter()
            .map(|f| (f.name.as_str(), f.raw.as_slice()))
    }

    // -- typed access -------------------------------------------------------
    //
    // All accessors panic on a foreign handle or a kind mismatch, same
    // policy as the handle accessors on `Value`.

    fn value(&self, id: PropertyId) -> &Value {
        &self.properties[id.0].value
    }

    fn value_mut(&mut self, id: PropertyId) -> &mut Value {
        &mut self.properties[id.0].value
    }

    #[must_use]
    pub fn get_int32(&self, id: PropertyId) -> i32 {
        self.value(id).as_int32()
    }

    pub fn set_int32(&mut self, id: PropertyId, v: i32) {
        self.value_mut(id).set_int32(v);
    }

    #[must_use]
    pub fn get_int64(&self, id: PropertyId) -> i64 {
        self.value(id).as_int64()
    }

    pub fn set_int64(&mut self, id: PropertyId, v: i64) {
        self.value_mut(id).set_int64(v);
    }

    #[must_use]
    pub fn get_bool(&self, id: PropertyId) -> bool {
        self.value(id).as_bool()
    }

    pub fn set_bool(&mut self, id: PropertyId, v: bool) {
        self.value_mut(id).set_bool(v);
    }

    #[must_use]
    pub fn get_str(&self, id: PropertyId) -> &str {
        self.value(id).as_str()
    }

    pub fn set_str(&mut self, id: PropertyId, v: impl Into<String>) {
        self.value_mut(id).set_str(v);
    }

    #[must_use]
    pub fn get_binary(&self, id: PropertyId) -> &[u8] {
        self.value(id).as_binary()
    }

    pub fn set_binary(&mut self, id: PropertyId, v: &[u8]) {
        self.value_mut(id).set_binary(v);
    }

    /// Name of the currently selected enum constant.
    #[must_use]
    pub fn get_enum(&self, id: PropertyId) -> &str {
        self.value(id).as_enum()
    }

    /// Select an enum constant by name; unknown names are a typed error,
    /// since they usually arrive from data rather than code.
    pub fn set_enum(&mut self, id: PropertyId, name: &str) -> Result<()> {
        self.value_mut(id).set_enum(name)
    }

    #[must_use]
    pub fn get_document(&self, id: PropertyId) -> &[u8] {
        self.value(id).as_document()
    }

    pub fn set_document(&mut self, id: PropertyId, doc: &[u8]) {
        self.value_mut(id).set_document(doc);
    }

    #[must_use]
    pub fn object(&self, id: PropertyId) -> &Record {
        self.value(id).as_object()
    }

    pub fn object_mut(&mut self, id: PropertyId) -> &mut Record {
        self.value_mut(id).as_object_mut()
    }

    #[must_use]
    pub fn array(&self, id: PropertyId) -> &ArrayValue {
        self.value(id).as_array()
    }

    pub fn array_mut(&mut self, id: PropertyId) -> &mut ArrayValue {
        self.value_mut(id).as_array_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Task {
        record: Record,
        id: PropertyId,
        name: PropertyId,
        retries: PropertyId,
    }

    fn task_record() -> Task {
        let mut b = Record::builder();
        let id = b.int64("id");
        let name = b.string("name");
        let retries = b.int32_with_default("retries", 3);
        Task {
            record: b.build(),
            id,
            name,
            retries,
        }
    }

    #[test]
    fn encodes_declared_properties_in_declaration_order() {
        let mut b = Record::builder();
        let id = b.int64("id");
        let name = b.string("name");
        let mut rec = b.build();
        rec.set_int64(id, 7);
        rec.set_str(name, "ops");

        let bytes = rec.to_bytes();
        assert_eq!(bytes.len(), rec.encoded_len());
        assert_eq!(
            bytes,
            [
                0x82, // 2 fields
                0xa2, b'i', b'd', 0x07, //
                0xa4, b'n', b'a', b'm', b'e', 0xa3, b'o', b'p', b's',
            ]
        );
    }

    #[test]
    fn wrap_roundtrips_all_declared_kinds() {
        let mut b = Record::builder();
        let i = b.int32("i");
        let l = b.int64("l");
        let f = b.boolean("f");
        let s = b.string("s");
        let raw = b.binary("raw");
        let state = b.enumeration("state", &["CREATED", "COMPLETED"]);
        let doc = b.document("doc");
        let mut rec = b.build();

        rec.set_int32(i, -9);
        rec.set_int64(l, 1 << 40);
        rec.set_bool(f, true);
        rec.set_str(s, "hello");
        rec.set_binary(raw, &[0xde, 0xad]);
        rec.set_enum(state, "COMPLETED").unwrap();
        rec.set_document(doc, &[0x81, 0xa1, b'k', 0x05]);

        let bytes = rec.to_bytes();
        assert_eq!(bytes.len(), rec.encoded_len());

        let mut b = Record::builder();
        let i = b.int32("i");
        let l = b.int64("l");
        let f = b.boolean("f");
        let s = b.string("s");
        let raw = b.binary("raw");
        let state = b.enumeration("state", &["CREATED", "COMPLETED"]);
        let doc = b.document("doc");
        let mut back = b.build();
        back.wrap(&bytes).unwrap();

        assert_eq!(back.get_int32(i), -9);
        assert_eq!(back.get_int64(l), 1 << 40);
        assert!(back.get_bool(f));
        assert_eq!(back.get_str(s), "hello");
        assert_eq!(back.get_binary(raw), [0xde, 0xad]);
        assert_eq!(back.get_enum(state), "COMPLETED");
        assert_eq!(back.get_document(doc), [0x81, 0xa1, b'k', 0x05]);
    }

    #[test]
    fn absent_fields_keep_their_defaults() {
        let mut t = task_record();
        // only "id" on the wire
        t.record.wrap(&[0x81, 0xa2, b'i', b'd', 0x2a]).unwrap();
        assert_eq!(t.record.get_int64(t.id), 42);
        assert_eq!(t.record.get_str(t.name), "");
        assert_eq!(t.record.get_int32(t.retries), 3);
    }

    #[test]
    fn wrap_resets_previous_state_first() {
        let mut t = task_record();
        t.record.set_str(t.name, "stale");
        t.record.set_int32(t.retries, 99);
        t.record.wrap(&[0x81, 0xa2, b'i', b'd', 0x01]).unwrap();
        assert_eq!(t.record.get_str(t.name), "");
        assert_eq!(t.record.get_int32(t.retries), 3);
    }

    #[test]
    fn undeclared_fields_pass_through_verbatim() {
        let mut t = task_record();
        // "id" declared; "z" undeclared with a deliberately wide uint16
        // encoding that must survive byte-for-byte
        let wire = [
            0x82, 0xa2, b'i', b'd', 0x07, 0xa1, b'z', 0xcd, 0x00, 0x07,
        ];
        t.record.wrap(&wire).unwrap();

        let captured: Vec<_> = t.record.undeclared().collect();
        assert_eq!(captured, [("z", &[0xcd, 0x00, 0x07][..])]);

        let out = t.record.to_bytes();
        assert_eq!(out.len(), t.record.encoded_len());
        // declared fields first in declaration order, then passthrough
        assert_eq!(
            out,
            [
                0x84, //
                0xa2, b'i', b'd', 0x07, //
                0xa4, b'n', b'a', b'm', b'e', 0xa0, //
                0xa7, b'r', b'e', b't', b'r', b'i', b'e', b's', 0x03, //
                0xa1, b'z', 0xcd, 0x00, 0x07,
            ]
        );
    }

    #[test]
    fn schema_evolution_keeps_unknown_fields_alive() {
        // writer A declares {a, b}
        let mut b = Record::builder();
        let a = b.int64("a");
        let bee = b.string("b");
        let mut writer = b.build();
        writer.set_int64(a, 42);
        writer.set_str(bee, "hi");
        let wire = writer.to_bytes();

        // reader B declares {a, c}; "b" is unknown to it
        let mut builder = Record::builder();
        let a = builder.int64("a");
        let c = builder.boolean("c");
        let mut reader = builder.build();
        reader.wrap(&wire).unwrap();

        assert_eq!(reader.get_int64(a), 42);
        assert!(!reader.get_bool(c));
        assert_eq!(
            reader.to_bytes(),
            [
                0x83, //
                0xa1, b'a', 0x2a, //
                0xa1, b'c', 0xc2, //
                0xa1, b'b', 0xa2, b'h', b'i',
            ]
        );
    }

    #[test]
    fn repeated_cycles_do_not_grow_the_document() {
        let mut b = Record::builder();
        let _a = b.int64("a");
        let mut rec = b.build();

        let mut wire = vec![
            0x83, 0xa1, b'a', 0x01, 0xa1, b'x', 0xa2, b'h', b'i', 0xa1, b'y', 0x05,
        ];
        let stable = wire.len();
        for _ in 0..5 {
            rec.wrap(&wire).unwrap();
            wire = rec.to_bytes();
            assert_eq!(wire.len(), stable);
        }
    }

    #[test]
    fn decode_error_names_the_property() {
        let mut t = task_record();
        // "name" carries an integer
        let wire = [0x81, 0xa4, b'n', b'a', b'm', b'e', 0x05];
        let err = t.record.wrap(&wire).unwrap_err();
        match err {
            FlowpackError::PropertyDecode { property, .. } => assert_eq!(property, "name"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn failed_wrap_leaves_the_record_reset() {
        let mut t = task_record();
        t.record
            .wrap(&[0x81, 0xa2, b'i', b'd', 0x07])
            .unwrap();
        assert_eq!(t.record.get_int64(t.id), 7);

        // truncated document: map claims a field that is not there
        assert!(t.record.wrap(&[0x81]).is_err());
        assert_eq!(t.record.get_int64(t.id), 0);
        assert_eq!(t.record.get_int32(t.retries), 3);
        assert_eq!(t.record.undeclared().count(), 0);
    }

    #[test]
    fn wrap_rejects_trailing_bytes() {
        let mut t = task_record();
        let err = t.record.wrap(&[0x80, 0x00]).unwrap_err();
        assert!(matches!(err, FlowpackError::Malformed { offset: 1, .. }));
    }

    #[test]
    fn wrap_rejects_non_map_roots_and_non_string_keys() {
        let mut t = task_record();
        assert!(matches!(
            t.record.wrap(&[0xc0]).unwrap_err(),
            FlowpackError::UnexpectedType { .. }
        ));
        assert!(matches!(
            t.record.wrap(&[0x93, 0x01, 0x02, 0x03]).unwrap_err(),
            FlowpackError::UnexpectedType { .. }
        ));
        // map key 1 is an integer
        assert!(matches!(
            t.record.wrap(&[0x81, 0x01, 0x02]).unwrap_err(),
            FlowpackError::UnexpectedType { .. }
        ));
    }

    #[test]
    fn nested_object_roundtrip() {
        let mut inner = Record::builder();
        let count = inner.int32("count");

        let mut b = Record::builder();
        let meta = b.object("meta", inner.build());
        let mut rec = b.build();

        rec.object_mut(meta).set_int32(count, 12);
        let bytes = rec.to_bytes();
        assert_eq!(bytes.len(), rec.encoded_len());

        rec.wrap(&bytes).unwrap();
        assert_eq!(rec.object(meta).get_int32(count), 12);
    }

    #[test]
    fn array_property_roundtrip_alongside_passthrough() {
        let mut b = Record::builder();
        let items = b.array("items", Int64Value::new());
        let mut rec = b.build();
        for i in [3_i64, 1, 4] {
            rec.array_mut(items).push(|e| e.set_int64(i));
        }
        let mut wire = rec.to_bytes();
        // splice an undeclared field in front of "items"
        wire[0] = 0x82;
        let extra = [0xa1, b'u', 0xc3];
        let mut patched = vec![wire[0]];
        patched.extend_from_slice(&extra);
        patched.extend_from_slice(&wire[1..]);

        rec.wrap(&patched).unwrap();
        assert_eq!(rec.array(items).len(), 3);
        let mut got = Vec::new();
        let mut cur = rec.array_mut(items).cursor();
        while cur.has_next() {
            got.push(cur.next().unwrap().as_int64());
        }
        drop(cur);
        assert_eq!(got, [3, 1, 4]);
        assert_eq!(rec.undeclared().count(), 1);
    }

    #[test]
    fn encoded_document_reads_back_as_json() {
        let mut t = task_record();
        t.record.set_int64(t.id, 7);
        t.record.set_str(t.name, "ops");
        let v = flowpack_codec::json::to_json(&t.record.to_bytes()).unwrap();
        assert_eq!(v, serde_json::json!({"id": 7, "name": "ops", "retries": 3}));
    }

    #[test]
    #[should_panic(expected = "declared twice")]
    fn duplicate_declaration_panics() {
        let mut b = Record::builder();
        b.int64("id");
        b.string("id");
    }

    #[test]
    #[should_panic(expected = "not string")]
    fn kind_mismatch_panics() {
        let t = task_record();
        let _ = t.record.get_str(t.id);
    }

    proptest! {
        #[test]
        fn roundtrip_preserves_every_field(
            id in any::<i64>(),
            name in ".{0,40}",
            retries in any::<i32>(),
            blob in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let mut b = Record::builder();
            let p_id = b.int64("id");
            let p_name = b.string("name");
            let p_retries = b.int32("retries");
            let p_blob = b.binary("blob");
            let mut rec = b.build();

            rec.set_int64(p_id, id);
            rec.set_str(p_name, name.clone());
            rec.set_int32(p_retries, retries);
            rec.set_binary(p_blob, &blob);

            let bytes = rec.to_bytes();
            prop_assert_eq!(bytes.len(), rec.encoded_len());

            let mut back = rec.clone();
            back.reset();
            back.wrap(&bytes).unwrap();
            prop_assert_eq!(back.get_int64(p_id), id);
            prop_assert_eq!(back.get_str(p_name), name);
            prop_assert_eq!(back.get_int32(p_retries), retries);
            prop_assert_eq!(back.get_binary(p_blob), &blob[..]);
            prop_assert_eq!(back.encoded_len(), bytes.len());
        }
    }
}
