//! MessagePack token codec: the byte-level layer under the flowpack record
//! and mapping crates.
//!
//! Split the way the format works: [`format`] holds marker constants and
//! canonical-length helpers, [`reader`] consumes tokens from a buffer,
//! [`writer`] appends tokens to one, and [`json`] converts whole documents
//! to and from `serde_json::Value` for diagnostics and tests.
//!
//! The codec knows nothing about schemas or properties; it deals in tokens
//! and exact byte lengths only.

pub mod format;
pub mod json;
pub mod reader;
pub mod writer;

pub use format::{EMPTY_DOCUMENT, MsgPackType, NIL_VALUE};
pub use reader::MsgPackReader;
pub use writer::MsgPackWriter;
