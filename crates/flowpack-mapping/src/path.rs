//! Document path expressions: `$`, `$.a.b`, `$.items[2]`, `$.items[*].v`.
//!
//! The leading `$.` is optional, so `a.b` and `$.a.b` name the same path.
//! `$` alone addresses the document root. Parsing is purely syntactic; no
//! document is consulted until the compiled path is resolved at apply time.

use std::fmt;

use flowpack_error::{FlowpackError, Result};

/// One step of a [`DocPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Map entry by key.
    Key(String),
    /// Array element by zero-based position.
    Index(usize),
    /// Every element of an array.
    Wildcard,
}

/// A parsed document path. Keeps the original spelling for error messages
/// and config round-trips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl DocPath {
    pub fn parse(expr: &str) -> Result<Self> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(FlowpackError::mapping_expression(expr, "empty expression"));
        }
        let rest = match trimmed.strip_prefix('$') {
            Some("") => {
                return Ok(Self {
                    raw: trimmed.to_owned(),
                    segments: Vec::new(),
                });
            }
            Some(tail) => tail.strip_prefix('.').ok_or_else(|| {
                FlowpackError::mapping_expression(expr, "expected '.' after '$'")
            })?,
            None => trimmed,
        };

        let mut segments = Vec::new();
        for step in rest.split('.') {
            if step.is_empty() {
                return Err(FlowpackError::mapping_expression(expr, "empty path segment"));
            }
            parse_step(expr, step, &mut segments)?;
        }
        Ok(Self {
            raw: trimmed.to_owned(),
            segments,
        })
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// `$` — the whole document.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, PathSegment::Wildcard))
    }

    /// The original spelling.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// One dot-separated step: a key, optionally followed by bracket suffixes,
// e.g. `items[0][*]`.
fn parse_step(expr: &str, step: &str, out: &mut Vec<PathSegment>) -> Result<()> {
    let (name, mut suffixes) = match step.find('[') {
        Some(0) => {
            return Err(FlowpackError::mapping_expression(
                expr,
                "missing key before '['",
            ));
        }
        Some(i) => (&step[..i], &step[i..]),
        None => (step, ""),
    };
    if name.contains(']') {
        return Err(FlowpackError::mapping_expression(expr, "stray ']'"));
    }
    if name.contains('*') {
        return Err(FlowpackError::mapping_expression(
            expr,
            "'*' is only valid as an array wildcard '[*]'",
        ));
    }
    out.push(PathSegment::Key(name.to_owned()));

    while !suffixes.is_empty() {
        debug_assert!(suffixes.starts_with('['));
        let close = suffixes
            .find(']')
            .ok_or_else(|| FlowpackError::mapping_expression(expr, "unterminated '['"))?;
        let inner = &suffixes[1..close];
        if inner == "*" {
            out.push(PathSegment::Wildcard);
        } else if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
            let index = inner.parse::<usize>().map_err(|_| {
                FlowpackError::mapping_expression(expr, "array index out of range")
            })?;
            out.push(PathSegment::Index(index));
        } else {
            return Err(FlowpackError::mapping_expression(
                expr,
                "expected a number or '*' between '[' and ']'",
            ));
        }
        suffixes = &suffixes[close + 1..];
        if !suffixes.is_empty() && !suffixes.starts_with('[') {
            return Err(FlowpackError::mapping_expression(
                expr,
                "unexpected characters after ']'",
            ));
        }
    }
    Ok(())
}
