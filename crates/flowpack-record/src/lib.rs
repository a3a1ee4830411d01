//! Reusable structured messages over the flowpack wire format.
//!
//! [`Record`] carries declared, typed properties and passes unknown fields
//! through verbatim. [`ArrayValue`] is the repeated-element container with
//! in-place cursor mutation. [`Value`] closes the set of encodable types.

pub mod array;
pub mod record;
pub mod value;

pub use array::{ArrayCursor, ArrayValue};
pub use record::{PropertyId, Record, RecordBuilder};
pub use value::{
    BinaryValue, BoolValue, DocumentValue, EnumValue, Int32Value, Int64Value, StringValue, Value,
};
