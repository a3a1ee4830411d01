//! Mapping runtime: build a target document by applying a compiled mapping
//! array to a source document.
//!
//! The target is assembled as a tree of byte spans. Untouched parts of the
//! base document (and every copied source value) stay unexpanded spans and
//! are written back verbatim; only the levels a target path descends
//! through are expanded, one level at a time. A missing source path is not
//! an error — the mapping simply contributes nothing, since partial
//! payloads are a normal occurrence in workflow data.

use std::borrow::Cow;

use flowpack_codec::format::MsgPackType;
use flowpack_codec::{MsgPackReader, MsgPackWriter, NIL_VALUE};
use flowpack_error::{FlowpackError, Result};
use tracing::trace;

use crate::compile::{Mapping, MappingKind};
use crate::path::PathSegment;

/// Apply `mappings` over `source`, producing a fresh target document.
///
/// Mappings apply in array order; later mappings overwrite earlier ones at
/// overlapping targets. An empty mapping array produces an empty document.
pub fn apply(mappings: &[Mapping], source: &[u8]) -> Result<Vec<u8>> {
    run(mappings, source, None)
}

/// Like [`apply`], but the target starts as `base` instead of empty, so
/// everything in `base` that no mapping overwrites survives verbatim.
pub fn merge(mappings: &[Mapping], source: &[u8], base: &[u8]) -> Result<Vec<u8>> {
    run(mappings, source, Some(base))
}

fn run<'a>(mappings: &'a [Mapping], source: &'a [u8], base: Option<&'a [u8]>) -> Result<Vec<u8>> {
    validate_document(source)?;
    let mut root = match base {
        Some(doc) => {
            validate_document(doc)?;
            Node::Leaf(Cow::Borrowed(doc))
        }
        None => Node::Map(Vec::new()),
    };
    for mapping in mappings {
        apply_one(&mut root, mapping, source)?;
    }
    let mut out = Vec::new();
    let mut w = MsgPackWriter::new(&mut out);
    write_node(&root, &mut w);
    Ok(out)
}

// Documents handed to the runtime must be a single well-formed map.
fn validate_document(doc: &[u8]) -> Result<()> {
    let mut r = MsgPackReader::new(doc);
    let ty = r.peek_type()?;
    if ty != MsgPackType::Map {
        return Err(FlowpackError::unexpected(0, "map document", ty.name()));
    }
    r.skip_value()?;
    if r.has_next() {
        return Err(FlowpackError::malformed(
            r.offset(),
            "trailing bytes after document",
        ));
    }
    Ok(())
}

fn apply_one<'a>(root: &mut Node<'a>, mapping: &'a Mapping, source: &'a [u8]) -> Result<()> {
    let mut matches = Vec::new();
    resolve(source, mapping.source().segments(), &mut matches)?;
    trace!(
        source = %mapping.source(),
        target = %mapping.target(),
        matches = matches.len(),
        "applying mapping"
    );
    if matches.is_empty() {
        return Ok(());
    }
    let value = match mapping.kind() {
        // A wildcard path has no single deterministic match, so collect
        // always produces an array for it, even for one match.
        MappingKind::Collect if mapping.source().has_wildcard() => {
            let mut buf = Vec::new();
            let mut w = MsgPackWriter::new(&mut buf);
            w.write_array_header(matches.len());
            for span in &matches {
                w.write_raw(span);
            }
            Node::Leaf(Cow::Owned(buf))
        }
        _ => Node::Leaf(Cow::Borrowed(matches[matches.len() - 1])),
    };
    insert(root, mapping.target().segments(), value)
}

/// Collect the spans of every value `segments` addresses in `value`, in
/// document order. Absent keys, short arrays, and kind mismatches yield no
/// match; only malformed bytes are an error.
fn resolve<'a>(value: &'a [u8], segments: &[PathSegment], out: &mut Vec<&'a [u8]>) -> Result<()> {
    let Some((segment, rest)) = segments.split_first() else {
        out.push(value);
        return Ok(());
    };
    match segment {
        PathSegment::Key(key) => {
            if leading_type(value) != Some(MsgPackType::Map) {
                return Ok(());
            }
            let mut r = MsgPackReader::new(value);
            let entries = r.read_map_header()?;
            for _ in 0..entries {
                let name = r.read_str()?;
                let span = r.skip_value()?;
                if name == key.as_str() {
                    return resolve(span, rest, out);
                }
            }
            Ok(())
        }
        PathSegment::Index(want) => {
            if leading_type(value) != Some(MsgPackType::Array) {
                return Ok(());
            }
            let mut r = MsgPackReader::new(value);
            let len = r.read_array_header()?;
            if *want >= len {
                return Ok(());
            }
            let mut span = r.skip_value()?;
            for _ in 0..*want {
                span = r.skip_value()?;
            }
            resolve(span, rest, out)
        }
        PathSegment::Wildcard => {
            if leading_type(value) != Some(MsgPackType::Array) {
                return Ok(());
            }
            let mut r = MsgPackReader::new(value);
            let len = r.read_array_header()?;
            for _ in 0..len {
                let span = r.skip_value()?;
                resolve(span, rest, out)?;
            }
            Ok(())
        }
    }
}

fn leading_type(bytes: &[u8]) -> Option<MsgPackType> {
    bytes.first().copied().and_then(MsgPackType::of)
}

/// Target tree under construction. `Leaf` holds an encoded value — either
/// a span borrowed from an input buffer, or bytes a collect built.
#[derive(Debug)]
enum Node<'a> {
    Leaf(Cow<'a, [u8]>),
    Map(Vec<(Cow<'a, str>, Node<'a>)>),
    Array(Vec<Node<'a>>),
}

impl<'a> Node<'a> {
    /// View this node as a map, expanding a map-valued leaf one level. Any
    /// other value loses to the path being written (last-writer-wins
    /// applies mid-path as well) and becomes a fresh empty map.
    fn make_map(&mut self) -> Result<&mut Vec<(Cow<'a, str>, Node<'a>)>> {
        if let Node::Leaf(bytes) = self {
            if leading_type(bytes) == Some(MsgPackType::Map) {
                let expanded = expand_entries(bytes)?;
                *self = Node::Map(expanded);
            }
        }
        if !matches!(self, Node::Map(_)) {
            *self = Node::Map(Vec::new());
        }
        match self {
            Node::Map(entries) => Ok(entries),
            _ => unreachable!(),
        }
    }

    fn make_array(&mut self) -> Result<&mut Vec<Node<'a>>> {
        if let Node::Leaf(bytes) = self {
            if leading_type(bytes) == Some(MsgPackType::Array) {
                let expanded = expand_items(bytes)?;
                *self = Node::Array(expanded);
            }
        }
        if !matches!(self, Node::Array(_)) {
            *self = Node::Array(Vec::new());
        }
        match self {
            Node::Array(items) => Ok(items),
            _ => unreachable!(),
        }
    }
}

// One-level expansion. A borrowed leaf yields borrowed child spans; an
// owned leaf (collect output) must copy, since its backing buffer is
// replaced by the expanded node.
fn expand_entries<'a>(bytes: &Cow<'a, [u8]>) -> Result<Vec<(Cow<'a, str>, Node<'a>)>> {
    match *bytes {
        Cow::Borrowed(span) => {
            let mut r = MsgPackReader::new(span);
            let n = r.read_map_header()?;
            let mut entries = Vec::with_capacity(n);
            for _ in 0..n {
                let key = r.read_str()?;
                let value = r.skip_value()?;
                entries.push((Cow::Borrowed(key), Node::Leaf(Cow::Borrowed(value))));
            }
            Ok(entries)
        }
        Cow::Owned(ref buf) => {
            let mut r = MsgPackReader::new(buf);
            let n = r.read_map_header()?;
            let mut entries = Vec::with_capacity(n);
            for _ in 0..n {
                let key = r.read_str()?.to_owned();
                let value = r.skip_value()?.to_vec();
                entries.push((Cow::Owned(key), Node::Leaf(Cow::Owned(value))));
            }
            Ok(entries)
        }
    }
}

fn expand_items<'a>(bytes: &Cow<'a, [u8]>) -> Result<Vec<Node<'a>>> {
    match *bytes {
        Cow::Borrowed(span) => {
            let mut r = MsgPackReader::new(span);
            let n = r.read_array_header()?;
            let mut items = Vec::with_capacity(n);
            for _ in 0..n {
                items.push(Node::Leaf(Cow::Borrowed(r.skip_value()?)));
            }
            Ok(items)
        }
        Cow::Owned(ref buf) => {
            let mut r = MsgPackReader::new(buf);
            let n = r.read_array_header()?;
            let mut items = Vec::with_capacity(n);
            for _ in 0..n {
                items.push(Node::Leaf(Cow::Owned(r.skip_value()?.to_vec())));
            }
            Ok(items)
        }
    }
}

fn insert<'a>(node: &mut Node<'a>, segments: &'a [PathSegment], value: Node<'a>) -> Result<()> {
    let Some((segment, rest)) = segments.split_first() else {
        return overlay_root(node, value);
    };
    let slot = match segment {
        PathSegment::Key(key) => {
            let entries = node.make_map()?;
            match entries.iter().position(|(k, _)| k.as_ref() == key.as_str()) {
                Some(i) => &mut entries[i].1,
                None => {
                    entries.push((Cow::Borrowed(key.as_str()), Node::Map(Vec::new())));
                    &mut entries.last_mut().expect("just pushed").1
                }
            }
        }
        PathSegment::Index(i) => {
            let items = node.make_array()?;
            // a target index past the end pads with nil, jq-style
            while items.len() <= *i {
                items.push(Node::Leaf(Cow::Borrowed(NIL_VALUE)));
            }
            &mut items[*i]
        }
        PathSegment::Wildcard => unreachable!("compile rejects wildcard targets"),
    };
    if rest.is_empty() {
        *slot = value;
        Ok(())
    } else {
        insert(slot, rest, value)
    }
}

// A map written to the root target overlays the document entry by entry;
// nothing else can become the root of a map document.
fn overlay_root<'a>(root: &mut Node<'a>, value: Node<'a>) -> Result<()> {
    let incoming = match value {
        Node::Leaf(bytes) if leading_type(&bytes) == Some(MsgPackType::Map) => {
            expand_entries(&bytes)?
        }
        Node::Map(entries) => entries,
        _ => {
            return Err(FlowpackError::unsupported(
                "only a map value can be mapped onto the document root",
            ));
        }
    };
    let entries = root.make_map()?;
    for (key, node) in incoming {
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = node,
            None => entries.push((key, node)),
        }
    }
    Ok(())
}

fn write_node(node: &Node<'_>, w: &mut MsgPackWriter<'_>) {
    match node {
        Node::Leaf(bytes) => w.write_raw(bytes),
        Node::Map(entries) => {
            w.write_map_header(entries.len());
            for (key, value) in entries {
                w.write_str(key);
                write_node(value, w);
            }
        }
        Node::Array(items) => {
            w.write_array_header(items.len());
            for item in items {
                write_node(item, w);
            }
        }
    }
}
