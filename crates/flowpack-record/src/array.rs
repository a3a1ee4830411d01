//! Repeated-element container: homogeneous elements stored back-to-back in
//! one growable byte arena, mutated in place through a borrowing cursor.
//!
//! The arena always holds canonical encodings, so the container's body
//! length is exactly the arena length and every splice keeps the aggregate
//! bookkeeping correct on its own; no operation re-scans the elements to
//! recount bytes. The cursor borrows the container exclusively, so nothing
//! can observe a half-spliced arena.

use flowpack_codec::format;
use flowpack_codec::{MsgPackReader, MsgPackWriter};
use flowpack_error::{FlowpackError, Result};

use crate::value::Value;

/// Homogeneous array value. The element type is fixed at declaration by a
/// prototype value whose defaults seed newly added elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayValue {
    prototype: Value,
    arena: Vec<u8>,
    count: usize,
}

impl ArrayValue {
    pub fn new(prototype: impl Into<Value>) -> Self {
        Self {
            prototype: prototype.into(),
            arena: Vec::new(),
            count: 0,
        }
    }

    /// Element count.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append one element at the end: the builder receives a fresh
    /// prototype-default element to fill in.
    pub fn push(&mut self, build: impl FnOnce(&mut Value)) {
        let mut element = self.prototype.clone();
        build(&mut element);
        let mut w = MsgPackWriter::new(&mut self.arena);
        element.write(&mut w);
        self.count += 1;
    }

    /// Open a cursor positioned before the first element.
    pub fn cursor(&mut self) -> ArrayCursor<'_> {
        ArrayCursor::new(self)
    }

    pub(crate) fn read(&mut self, r: &mut MsgPackReader<'_>) -> Result<()> {
        let result = self.read_elements(r);
        if result.is_err() {
            self.reset();
        }
        result
    }

    // Elements are re-encoded one at a time so the arena holds canonical
    // widths even when the wire used wider ones.
    fn read_elements(&mut self, r: &mut MsgPackReader<'_>) -> Result<()> {
        self.reset();
        let count = r.read_array_header()?;
        let mut scratch = self.prototype.clone();
        for _ in 0..count {
            scratch.read(r)?;
            let mut w = MsgPackWriter::new(&mut self.arena);
            scratch.write(&mut w);
        }
        self.count = count;
        Ok(())
    }

    pub(crate) fn write(&self, w: &mut MsgPackWriter<'_>) {
        w.write_array_header(self.count);
        w.write_raw(&self.arena);
    }

    /// Exact encoded byte count: header plus arena.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        format::array_header_len(self.count) + self.arena.len()
    }

    /// Discard all elements.
    pub fn reset(&mut self) {
        self.arena.clear();
        self.count = 0;
    }
}

/// Byte span of the element the last `next()` returned.
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    len: usize,
}

/// Exclusive iteration and mutation cursor over an [`ArrayValue`].
///
/// The cursor sits between elements. `next()` decodes the element after the
/// cursor into a reusable handle and moves past it. `add()` inserts a new
/// element immediately before the cursor, so a fresh cursor prepends, an
/// exhausted one appends, and consecutive adds keep their order. `remove()`
/// deletes the element the last `next()` returned; it is a typed error
/// before the first `next()`, twice for the same element, or after an
/// intervening `add()`. Mutations made through the handle are spliced back
/// into the arena on the following cursor operation, or when the cursor is
/// dropped.
#[derive(Debug)]
pub struct ArrayCursor<'a> {
    array: &'a mut ArrayValue,
    scratch: Value,
    encode_buf: Vec<u8>,
    /// Elements the cursor has passed.
    index: usize,
    /// Byte offset of the cursor in the arena.
    offset: usize,
    current: Option<Span>,
}

impl<'a> ArrayCursor<'a> {
    fn new(array: &'a mut ArrayValue) -> Self {
        let scratch = array.prototype.clone();
        Self {
            array,
            scratch,
            encode_buf: Vec::new(),
            index: 0,
            offset: 0,
            current: None,
        }
    }

    /// Number of elements the cursor has passed.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.index
    }

    /// Whether `next()` would yield another element.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.index < self.array.count
    }

    /// Advance to the next element and return a mutable handle to it.
    pub fn next(&mut self) -> Result<&mut Value> {
        self.flush_current();
        if self.index == self.array.count {
            return Err(FlowpackError::CursorExhausted);
        }
        let mut r = MsgPackReader::new(&self.array.arena[self.offset..]);
        self.scratch.read(&mut r)?;
        let len = r.offset();
        self.current = Some(Span {
            start: self.offset,
            len,
        });
        self.offset += len;
        self.index += 1;
        Ok(&mut self.scratch)
    }

    /// Insert a new element immediately before the cursor. The builder
    /// receives a fresh prototype-default element to fill in.
    pub fn add(&mut self, build: impl FnOnce(&mut Value)) {
        self.flush_current();
        self.scratch.reset();
        build(&mut self.scratch);
        self.encode_buf.clear();
        let mut w = MsgPackWriter::new(&mut self.encode_buf);
        self.scratch.write(&mut w);
        let inserted = self.encode_buf.len();
        self.array
            .arena
            .splice(self.offset..self.offset, self.encode_buf.drain(..));
        self.array.count += 1;
        self.offset += inserted;
        self.index += 1;
    }

    /// Remove the element the last `next()` returned.
    pub fn remove(&mut self) -> Result<()> {
        let Some(cur) = self.current.take() else {
            return Err(FlowpackError::CursorMisuse {
                detail: "no element to remove; call next() first",
            });
        };
        self.array.arena.drain(cur.start..cur.start + cur.len);
        self.array.count -= 1;
        self.offset = cur.start;
        self.index -= 1;
        Ok(())
    }

    // Re-encode the handle over the last-returned element's span; a length
    // change shifts everything after it.
    fn flush_current(&mut self) {
        let Some(cur) = self.current.take() else {
            return;
        };
        self.encode_buf.clear();
        let mut w = MsgPackWriter::new(&mut self.encode_buf);
        self.scratch.write(&mut w);
        let new_len = self.encode_buf.len();
        self.array
            .arena
            .splice(cur.start..cur.start + cur.len, self.encode_buf.drain(..));
        self.offset = cur.start + new_len;
    }
}

impl Drop for ArrayCursor<'_> {
    fn drop(&mut self) {
        self.flush_current();
    }
}
