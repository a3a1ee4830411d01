//! Compilation of mapping configuration triples.
//!
//! Compilation is purely syntactic: both expressions are parsed and
//! validated, but no document is consulted. The caller (the definition
//! layer) is expected to compile once per deployed definition and cache the
//! resulting array for its lifetime.

use flowpack_error::{FlowpackError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::path::DocPath;

/// How a mapping moves values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MappingKind {
    /// Copy the matched value to the target path. On a multi-match source
    /// path each match overwrites the last, like repeated puts.
    #[default]
    Put,
    /// Gather every match of a multi-match source path into one array at
    /// the target path.
    Collect,
}

/// One configuration triple as declared on a task or flow element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDecl {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub kind: MappingKind,
}

impl MappingDecl {
    pub fn put(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: MappingKind::Put,
        }
    }

    pub fn collect(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: MappingKind::Collect,
        }
    }
}

/// A compiled, immutable mapping. Compiled arrays never change after
/// [`compile`] returns, so they are safe to share read-only across threads;
/// applying a mapping only touches the caller-supplied buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    source: DocPath,
    target: DocPath,
    kind: MappingKind,
}

impl Mapping {
    #[must_use]
    pub fn source(&self) -> &DocPath {
        &self.source
    }

    #[must_use]
    pub fn target(&self) -> &DocPath {
        &self.target
    }

    #[must_use]
    pub const fn kind(&self) -> MappingKind {
        self.kind
    }
}

/// Compile configuration triples into an ordered mapping array.
///
/// Order is preserved; application order is array order. An element with no
/// declared mappings compiles to an empty array, which callers must treat
/// the same as "no mappings". Target paths must address one location, so
/// wildcards in the target are a compile error.
pub fn compile(decls: &[MappingDecl]) -> Result<Vec<Mapping>> {
    let mut mappings = Vec::with_capacity(decls.len());
    for decl in decls {
        let source = DocPath::parse(&decl.source)?;
        let target = DocPath::parse(&decl.target)?;
        if target.has_wildcard() {
            return Err(FlowpackError::mapping_expression(
                &decl.target,
                "wildcards are not allowed in target paths",
            ));
        }
        mappings.push(Mapping {
            source,
            target,
            kind: decl.kind,
        });
    }
    debug!(count = mappings.len(), "compiled mapping array");
    Ok(mappings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_declarations_compile_to_an_empty_array() {
        assert!(compile(&[]).unwrap().is_empty());
    }

    #[test]
    fn compile_preserves_order_and_kind() {
        let decls = [
            MappingDecl::put("$.a.b", "$.x"),
            MappingDecl::collect("$.items[*].v", "$.total"),
        ];
        let mappings = compile(&decls).unwrap();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].kind(), MappingKind::Put);
        assert_eq!(mappings[0].source().as_str(), "$.a.b");
        assert_eq!(mappings[1].kind(), MappingKind::Collect);
        assert_eq!(mappings[1].target().as_str(), "$.total");
    }

    #[test]
    fn wildcard_in_target_is_rejected() {
        let err = compile(&[MappingDecl::put("$.a", "$.out[*]")]).unwrap_err();
        match err {
            FlowpackError::InvalidMappingExpression { expression, detail } => {
                assert_eq!(expression, "$.out[*]");
                assert!(detail.contains("target"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unparsable_source_is_rejected() {
        let err = compile(&[MappingDecl::put("$.a[", "$.x")]).unwrap_err();
        assert!(matches!(
            err,
            FlowpackError::InvalidMappingExpression { .. }
        ));
    }

    #[test]
    fn declarations_deserialize_from_config() {
        let decls: Vec<MappingDecl> = serde_json::from_str(
            r#"[
                {"source": "$.a", "target": "$.b", "kind": "COLLECT"},
                {"source": "$.c", "target": "$.d"}
            ]"#,
        )
        .unwrap();
        assert_eq!(decls[0].kind, MappingKind::Collect);
        // kind defaults to PUT when the config omits it
        assert_eq!(decls[1].kind, MappingKind::Put);
        assert!(compile(&decls).is_ok());
    }
}
