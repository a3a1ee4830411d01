//! Value variants: the closed union of everything a property can hold.
//!
//! Each variant struct owns its payload and carries its declared default;
//! `read` always resets before decoding, so a value is never decoded on top
//! of stale state. Writes are infallible and produce exactly
//! `encoded_len()` bytes, which is what makes two-pass container encoding
//! possible.

use flowpack_codec::format::{self, MsgPackType};
use flowpack_codec::{EMPTY_DOCUMENT, MsgPackReader, MsgPackWriter, NIL_VALUE};
use flowpack_error::{FlowpackError, Result};

use crate::array::ArrayValue;
use crate::record::Record;

// ---------------------------------------------------------------------------
// Scalar variants
// ---------------------------------------------------------------------------

/// 32-bit signed integer. Decodes any canonical width whose value fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Int32Value {
    value: i32,
    default: i32,
}

impl Int32Value {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_default(0)
    }

    #[must_use]
    pub const fn with_default(default: i32) -> Self {
        Self {
            value: default,
            default,
        }
    }

    #[must_use]
    pub const fn get(&self) -> i32 {
        self.value
    }

    pub const fn set(&mut self, value: i32) {
        self.value = value;
    }

    pub(crate) fn read(&mut self, r: &mut MsgPackReader<'_>) -> Result<()> {
        self.reset();
        let wide = r.read_integer()?;
        self.value = i32::try_from(wide).map_err(|_| FlowpackError::IntegerOutOfRange {
            value: i128::from(wide),
            width: "i32",
        })?;
        Ok(())
    }

    pub(crate) fn write(&self, w: &mut MsgPackWriter<'_>) {
        w.write_integer(i64::from(self.value));
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        format::integer_len(i64::from(self.value))
    }

    pub const fn reset(&mut self) {
        self.value = self.default;
    }
}

impl Default for Int32Value {
    fn default() -> Self {
        Self::new()
    }
}

/// 64-bit signed integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Int64Value {
    value: i64,
    default: i64,
}

impl Int64Value {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_default(0)
    }

    #[must_use]
    pub const fn with_default(default: i64) -> Self {
        Self {
            value: default,
            default,
        }
    }

    #[must_use]
    pub const fn get(&self) -> i64 {
        self.value
    }

    pub const fn set(&mut self, value: i64) {
        self.value = value;
    }

    pub(crate) fn read(&mut self, r: &mut MsgPackReader<'_>) -> Result<()> {
        self.reset();
        self.value = r.read_integer()?;
        Ok(())
    }

    pub(crate) fn write(&self, w: &mut MsgPackWriter<'_>) {
        w.write_integer(self.value);
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        format::integer_len(self.value)
    }

    pub const fn reset(&mut self) {
        self.value = self.default;
    }
}

impl Default for Int64Value {
    fn default() -> Self {
        Self::new()
    }
}

/// Boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoolValue {
    value: bool,
    default: bool,
}

impl BoolValue {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_default(false)
    }

    #[must_use]
    pub const fn with_default(default: bool) -> Self {
        Self {
            value: default,
            default,
        }
    }

    #[must_use]
    pub const fn get(&self) -> bool {
        self.value
    }

    pub const fn set(&mut self, value: bool) {
        self.value = value;
    }

    pub(crate) fn read(&mut self, r: &mut MsgPackReader<'_>) -> Result<()> {
        self.reset();
        self.value = r.read_bool()?;
        Ok(())
    }

    pub(crate) fn write(&self, w: &mut MsgPackWriter<'_>) {
        w.write_bool(self.value);
    }

    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        format::BOOL_LEN
    }

    pub const fn reset(&mut self) {
        self.value = self.default;
    }
}

impl Default for BoolValue {
    fn default() -> Self {
        Self::new()
    }
}

/// UTF-8 string. Length-prefixed on the wire; the current content decides
/// the encoded length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringValue {
    value: String,
    default: String,
}

impl StringValue {
    #[must_use]
    pub fn new() -> Self {
        Self::with_default("")
    }

    #[must_use]
    pub fn with_default(default: impl Into<String>) -> Self {
        let default = default.into();
        Self {
            value: default.clone(),
            default,
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.value
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub(crate) fn read(&mut self, r: &mut MsgPackReader<'_>) -> Result<()> {
        self.reset();
        let text = r.read_str()?;
        self.value.clear();
        self.value.push_str(text);
        Ok(())
    }

    pub(crate) fn write(&self, w: &mut MsgPackWriter<'_>) {
        w.write_str(&self.value);
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        format::str_len(self.value.len())
    }

    pub fn reset(&mut self) {
        self.value.clone_from(&self.default);
    }
}

impl Default for StringValue {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw byte blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryValue {
    value: Vec<u8>,
    default: Vec<u8>,
}

impl BinaryValue {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: Vec::new(),
            default: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_default(default: &[u8]) -> Self {
        Self {
            value: default.to_vec(),
            default: default.to_vec(),
        }
    }

    #[must_use]
    pub fn get(&self) -> &[u8] {
        &self.value
    }

    pub fn set(&mut self, value: &[u8]) {
        self.value.clear();
        self.value.extend_from_slice(value);
    }

    pub(crate) fn read(&mut self, r: &mut MsgPackReader<'_>) -> Result<()> {
        self.reset();
        let bytes = r.read_bin()?;
        self.value.clear();
        self.value.extend_from_slice(bytes);
        Ok(())
    }

    pub(crate) fn write(&self, w: &mut MsgPackWriter<'_>) {
        w.write_bin(&self.value);
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        format::bin_len(self.value.len())
    }

    pub fn reset(&mut self) {
        self.value.clone_from(&self.default);
    }
}

impl Default for BinaryValue {
    fn default() -> Self {
        Self::new()
    }
}

/// Enum over a closed list of textual constants, encoded as its constant
/// name. Decoding text outside the list is a typed error, never a silent
/// fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    constants: Vec<String>,
    selected: usize,
    default: usize,
}

impl EnumValue {
    /// Declare the constant list; the first constant is the default.
    ///
    /// # Panics
    /// If the list is empty.
    #[must_use]
    pub fn new(constants: &[&str]) -> Self {
        assert!(!constants.is_empty(), "enum needs at least one constant");
        Self {
            constants: constants.iter().map(|c| (*c).to_owned()).collect(),
            selected: 0,
            default: 0,
        }
    }

    /// Declare the constant list with an explicit default.
    ///
    /// # Panics
    /// If the default is not in the list.
    #[must_use]
    pub fn with_default(constants: &[&str], default: &str) -> Self {
        let mut value = Self::new(constants);
        let Some(idx) = value.constants.iter().position(|c| c == default) else {
            panic!("enum default '{default}' is not a declared constant");
        };
        value.selected = idx;
        value.default = idx;
        value
    }

    /// Currently selected constant name.
    #[must_use]
    pub fn get(&self) -> &str {
        &self.constants[self.selected]
    }

    /// Select a constant by name.
    pub fn set(&mut self, name: &str) -> Result<()> {
        match self.constants.iter().position(|c| c == name) {
            Some(idx) => {
                self.selected = idx;
                Ok(())
            }
            None => Err(FlowpackError::unknown_enum(name, &self.constants)),
        }
    }

    pub(crate) fn read(&mut self, r: &mut MsgPackReader<'_>) -> Result<()> {
        self.reset();
        let text = r.read_str()?;
        self.set(text)
    }

    pub(crate) fn write(&self, w: &mut MsgPackWriter<'_>) {
        w.write_str(self.get());
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        format::str_len(self.get().len())
    }

    pub const fn reset(&mut self) {
        self.selected = self.default;
    }
}

// ---------------------------------------------------------------------------
// Embedded document
// ---------------------------------------------------------------------------

/// Opaque pre-encoded document, stored and re-emitted verbatim.
///
/// Empty and nil inputs normalize to the canonical empty object, so a
/// document value never holds literal nil. The caller guarantees a set
/// buffer holds exactly one whole value; on decode only map and nil tokens
/// are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentValue {
    value: Vec<u8>,
    default: Vec<u8>,
}

impl DocumentValue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: EMPTY_DOCUMENT.to_vec(),
            default: EMPTY_DOCUMENT.to_vec(),
        }
    }

    #[must_use]
    pub fn get(&self) -> &[u8] {
        &self.value
    }

    pub fn set(&mut self, doc: &[u8]) {
        self.value.clear();
        if doc.is_empty() || doc == NIL_VALUE {
            self.value.extend_from_slice(EMPTY_DOCUMENT);
        } else {
            self.value.extend_from_slice(doc);
        }
    }

    pub(crate) fn read(&mut self, r: &mut MsgPackReader<'_>) -> Result<()> {
        self.reset();
        match r.peek_type()? {
            MsgPackType::Nil => {
                r.read_nil()?;
                self.set(&[]);
            }
            MsgPackType::Map => {
                let span = r.skip_value()?;
                self.set(span);
            }
            other => {
                return Err(FlowpackError::unexpected(
                    r.offset(),
                    "map or nil",
                    other.name(),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn write(&self, w: &mut MsgPackWriter<'_>) {
        w.write_raw(&self.value);
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.value.len()
    }

    pub fn reset(&mut self) {
        self.value.clone_from(&self.default);
    }
}

impl Default for DocumentValue {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// The closed union
// ---------------------------------------------------------------------------

/// One encodable unit: a scalar, an embedded document, a nested record, or
/// a repeated-element container.
///
/// Encode and decode dispatch through a single exhaustive match; adding a
/// variant forces every site to decide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int32(Int32Value),
    Int64(Int64Value),
    Bool(BoolValue),
    Str(StringValue),
    Bin(BinaryValue),
    Enum(EnumValue),
    Document(DocumentValue),
    Object(Box<Record>),
    Array(Box<ArrayValue>),
}

impl Value {
    pub(crate) fn read(&mut self, r: &mut MsgPackReader<'_>) -> Result<()> {
        match self {
            Self::Int32(v) => v.read(r),
            Self::Int64(v) => v.read(r),
            Self::Bool(v) => v.read(r),
            Self::Str(v) => v.read(r),
            Self::Bin(v) => v.read(r),
            Self::Enum(v) => v.read(r),
            Self::Document(v) => v.read(r),
            Self::Object(v) => v.read(r),
            Self::Array(v) => v.read(r),
        }
    }

    pub(crate) fn write(&self, w: &mut MsgPackWriter<'_>) {
        match self {
            Self::Int32(v) => v.write(w),
            Self::Int64(v) => v.write(w),
            Self::Bool(v) => v.write(w),
            Self::Str(v) => v.write(w),
            Self::Bin(v) => v.write(w),
            Self::Enum(v) => v.write(w),
            Self::Document(v) => v.write(w),
            Self::Object(v) => v.write(w),
            Self::Array(v) => v.write(w),
        }
    }

    /// Exact byte count `write` will produce for the current content.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Int32(v) => v.encoded_len(),
            Self::Int64(v) => v.encoded_len(),
            Self::Bool(v) => v.encoded_len(),
            Self::Str(v) => v.encoded_len(),
            Self::Bin(v) => v.encoded_len(),
            Self::Enum(v) => v.encoded_len(),
            Self::Document(v) => v.encoded_len(),
            Self::Object(v) => v.encoded_len(),
            Self::Array(v) => v.encoded_len(),
        }
    }

    /// Restore the declared default (or the type's zero value).
    pub fn reset(&mut self) {
        match self {
            Self::Int32(v) => v.reset(),
            Self::Int64(v) => v.reset(),
            Self::Bool(v) => v.reset(),
            Self::Str(v) => v.reset(),
            Self::Bin(v) => v.reset(),
            Self::Enum(v) => v.reset(),
            Self::Document(v) => v.reset(),
            Self::Object(v) => v.reset(),
            Self::Array(v) => v.reset(),
        }
    }

    /// Variant name for panic and error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Bool(_) => "boolean",
            Self::Str(_) => "string",
            Self::Bin(_) => "binary",
            Self::Enum(_) => "enum",
            Self::Document(_) => "document",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
        }
    }

    // -- typed access -------------------------------------------------------
    //
    // Kind mismatches panic: a handle used against the wrong variant is a
    // call-site bug, like indexing out of bounds. Data-dependent failures
    // stay typed errors.

    #[must_use]
    pub fn as_int32(&self) -> i32 {
        match self {
            Self::Int32(v) => v.get(),
            other => panic!("value is {}, not int32", other.kind()),
        }
    }

    pub fn set_int32(&mut self, value: i32) {
        match self {
            Self::Int32(v) => v.set(value),
            other => panic!("value is {}, not int32", other.kind()),
        }
    }

    #[must_use]
    pub fn as_int64(&self) -> i64 {
        match self {
            Self::Int64(v) => v.get(),
            other => panic!("value is {}, not int64", other.kind()),
        }
    }

    pub fn set_int64(&mut self, value: i64) {
        match self {
            Self::Int64(v) => v.set(value),
            other => panic!("value is {}, not int64", other.kind()),
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(v) => v.get(),
            other => panic!("value is {}, not boolean", other.kind()),
        }
    }

    pub fn set_bool(&mut self, value: bool) {
        match self {
            Self::Bool(v) => v.set(value),
            other => panic!("value is {}, not boolean", other.kind()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Str(v) => v.get(),
            other => panic!("value is {}, not string", other.kind()),
        }
    }

    pub fn set_str(&mut self, value: impl Into<String>) {
        match self {
            Self::Str(v) => v.set(value),
            other => panic!("value is {}, not string", other.kind()),
        }
    }

    #[must_use]
    pub fn as_binary(&self) -> &[u8] {
        match self {
            Self::Bin(v) => v.get(),
            other => panic!("value is {}, not binary", other.kind()),
        }
    }

    pub fn set_binary(&mut self, value: &[u8]) {
        match self {
            Self::Bin(v) => v.set(value),
            other => panic!("value is {}, not binary", other.kind()),
        }
    }

    #[must_use]
    pub fn as_enum(&self) -> &str {
        match self {
            Self::Enum(v) => v.get(),
            other => panic!("value is {}, not enum", other.kind()),
        }
    }

    pub fn set_enum(&mut self, name: &str) -> Result<()> {
        match self {
            Self::Enum(v) => v.set(name),
            other => panic!("value is {}, not enum", other.kind()),
        }
    }

    #[must_use]
    pub fn as_document(&self) -> &[u8] {
        match self {
            Self::Document(v) => v.get(),
            other => panic!("value is {}, not document", other.kind()),
        }
    }

    pub fn set_document(&mut self, doc: &[u8]) {
        match self {
            Self::Document(v) => v.set(doc),
            other => panic!("value is {}, not document", other.kind()),
        }
    }

    #[must_use]
    pub fn as_object(&self) -> &Record {
        match self {
            Self::Object(v) => v,
            other => panic!("value is {}, not object", other.kind()),
        }
    }

    pub fn as_object_mut(&mut self) -> &mut Record {
        match self {
            Self::Object(v) => v,
            other => panic!("value is {}, not object", other.kind()),
        }
    }

    #[must_use]
    pub fn as_array(&self) -> &ArrayValue {
        match self {
            Self::Array(v) => v,
            other => panic!("value is {}, not array", other.kind()),
        }
    }

    pub fn as_array_mut(&mut self) -> &mut ArrayValue {
        match self {
            Self::Array(v) => v,
            other => panic!("value is {}, not array", other.kind()),
        }
    }
}

impl From<Int32Value> for Value {
    fn from(v: Int32Value) -> Self {
        Self::Int32(v)
    }
}

impl From<Int64Value> for Value {
    fn from(v: Int64Value) -> Self {
        Self::Int64(v)
    }
}

impl From<BoolValue> for Value {
    fn from(v: BoolValue) -> Self {
        Self::Bool(v)
    }
}

impl From<StringValue> for Value {
    fn from(v: StringValue) -> Self {
        Self::Str(v)
    }
}

impl From<BinaryValue> for Value {
    fn from(v: BinaryValue) -> Self {
        Self::Bin(v)
    }
}

impl From<EnumValue> for Value {
    fn from(v: EnumValue) -> Self {
        Self::Enum(v)
    }
}

impl From<DocumentValue> for Value {
    fn from(v: DocumentValue) -> Self {
        Self::Document(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Self::Object(Box::new(v))
    }
}

impl From<ArrayValue> for Value {
    fn from(v: ArrayValue) -> Self {
        Self::Array(Box::new(v))
    }
}
