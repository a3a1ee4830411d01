//! Public API facade for flowpack: binary structured documents for a
//! workflow engine core. Schema-declared records with unknown-field
//! passthrough, splice-editable repeated containers, and a payload mapping
//! compiler and runtime, all over one compact self-describing wire format.
//!
//! ```
//! use flowpack::{MappingDecl, Record, apply, compile};
//!
//! # fn main() -> flowpack::Result<()> {
//! // declare a schema once, reuse the record per message
//! let mut b = Record::builder();
//! let order = b.int64("order");
//! let total = b.int32("total");
//! let mut rec = b.build();
//!
//! rec.set_int64(order, 7001);
//! rec.set_int32(total, 99);
//! let wire = rec.to_bytes();
//!
//! // move a field into a fresh payload for the next task
//! let mappings = compile(&[MappingDecl::put("$.total", "$.amount")])?;
//! let payload = apply(&mappings, &wire)?;
//!
//! let mut b = Record::builder();
//! let amount = b.int32("amount");
//! let mut rec = b.build();
//! rec.wrap(&payload)?;
//! assert_eq!(rec.get_int32(amount), 99);
//! # Ok(())
//! # }
//! ```

pub use flowpack_codec as codec;
pub use flowpack_error::{ErrorClass, FlowpackError, Result};
pub use flowpack_mapping::{
    DocPath, Mapping, MappingDecl, MappingKind, PathSegment, apply, compile, merge,
};
pub use flowpack_record::{
    ArrayCursor, ArrayValue, BinaryValue, BoolValue, DocumentValue, EnumValue, Int32Value,
    Int64Value, PropertyId, Record, RecordBuilder, StringValue, Value,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_encode_is_readable_through_the_codec() {
        let mut b = Record::builder();
        let id = b.int64("id");
        let mut rec = b.build();
        rec.set_int64(id, 314);
        let json = codec::json::to_json(&rec.to_bytes()).unwrap();
        assert_eq!(json, serde_json::json!({"id": 314}));
    }

    #[test]
    fn errors_classify_for_the_caller() {
        let mut b = Record::builder();
        b.string("s");
        let mut rec = b.build();
        let err = rec.wrap(&[0xc1]).unwrap_err();
        assert_eq!(err.class(), ErrorClass::MalformedDocument);
    }

    #[test]
    fn mapping_surface_is_reachable_from_the_facade() {
        let mappings = compile(&[MappingDecl::collect("$.v[*]", "$.all")]).unwrap();
        assert_eq!(mappings[0].kind(), MappingKind::Collect);
        let source = codec::json::to_msgpack(&serde_json::json!({"v": [4, 5]})).unwrap();
        let out = apply(&mappings, &source).unwrap();
        assert_eq!(
            codec::json::to_json(&out).unwrap(),
            serde_json::json!({"all": [4, 5]})
        );
    }
}
