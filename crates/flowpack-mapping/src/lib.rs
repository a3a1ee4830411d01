//! Payload mapping: compile `(source, target, kind)` triples once per
//! deployed definition, then apply the compiled array to documents any
//! number of times, from any number of threads.
//!
//! ```
//! use flowpack_mapping::{MappingDecl, apply, compile};
//!
//! # fn main() -> flowpack_error::Result<()> {
//! let mappings = compile(&[MappingDecl::put("$.order.total", "$.amount")])?;
//! let source = flowpack_codec::json::to_msgpack(
//!     &serde_json::json!({"order": {"total": 99}}),
//! )?;
//! let target = apply(&mappings, &source)?;
//! assert_eq!(flowpack_codec::json::to_json(&target)?, serde_json::json!({"amount": 99}));
//! # Ok(())
//! # }
//! ```

pub mod compile;
pub mod path;
pub mod runtime;

pub use compile::{Mapping, MappingDecl, MappingKind, compile};
pub use path::{DocPath, PathSegment};
pub use runtime::{apply, merge};
