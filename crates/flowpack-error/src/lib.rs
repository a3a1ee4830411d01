use thiserror::Error;

/// Primary error type for flowpack operations.
///
/// Structured variants for the decode, cursor, and mapping failure modes;
/// every variant that points into a buffer carries the byte offset at which
/// the failure was detected.
#[derive(Error, Debug)]
pub enum FlowpackError {
    // === Token stream errors ===
    /// Input bytes do not match the wire grammar.
    #[error("malformed document at offset {offset}: {detail}")]
    Malformed { offset: usize, detail: String },

    /// A token's declared payload runs past the end of the buffer.
    #[error("truncated value at offset {offset}: need {needed} more bytes, {available} remain")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A well-formed token of the wrong kind at this position.
    #[error("unexpected {actual} at offset {offset}: expected {expected}")]
    UnexpectedType {
        offset: usize,
        expected: &'static str,
        actual: &'static str,
    },

    /// A canonical integer that does not fit the destination width.
    #[error("integer {value} out of range for {width}")]
    IntegerOutOfRange { value: i128, width: &'static str },

    // === Record decode errors ===
    /// A declared property's typed read failed. The owning record has been
    /// fully reset by the time this is returned.
    #[error("cannot decode property '{property}': {source}")]
    PropertyDecode {
        property: String,
        #[source]
        source: Box<FlowpackError>,
    },

    /// Decoded enum text matches none of the declared constants.
    #[error("unknown enum value '{value}' (expected one of: {expected})")]
    UnknownEnumValue { value: String, expected: String },

    // === Cursor errors ===
    /// `next()` was called on an exhausted array cursor.
    #[error("array cursor is exhausted")]
    CursorExhausted,

    /// A cursor operation violated the iteration protocol.
    #[error("array cursor misuse: {detail}")]
    CursorMisuse { detail: &'static str },

    // === Mapping errors ===
    /// A mapping path expression was rejected at compile time.
    #[error("invalid mapping expression '{expression}': {detail}")]
    InvalidMappingExpression { expression: String, detail: String },

    // === Conversion errors ===
    /// A value outside the representable set of the target encoding.
    #[error("unsupported value: {detail}")]
    Unsupported { detail: String },
}

/// Coarse failure buckets, used by callers to decide between rejecting a
/// document, raising a configuration problem, and fixing a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The input buffer violates the wire grammar; the document is unusable.
    MalformedDocument,
    /// The buffer is well-formed but does not fit the declared schema.
    SchemaMismatch,
    /// An iteration-protocol violation at a call site.
    CursorProtocol,
    /// A rejected mapping declaration; a deployment-time problem.
    MappingConfig,
    /// A value the target representation cannot express.
    Unsupported,
}

impl FlowpackError {
    /// Map this error to its coarse failure bucket.
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Malformed { .. } | Self::Truncated { .. } | Self::UnexpectedType { .. } => {
                ErrorClass::MalformedDocument
            }
            Self::IntegerOutOfRange { .. }
            | Self::PropertyDecode { .. }
            | Self::UnknownEnumValue { .. } => ErrorClass::SchemaMismatch,
            Self::CursorExhausted | Self::CursorMisuse { .. } => ErrorClass::CursorProtocol,
            Self::InvalidMappingExpression { .. } => ErrorClass::MappingConfig,
            Self::Unsupported { .. } => ErrorClass::Unsupported,
        }
    }

    /// Byte offset of the failure, for errors that point into a buffer.
    pub const fn offset(&self) -> Option<usize> {
        match self {
            Self::Malformed { offset, .. }
            | Self::Truncated { offset, .. }
            | Self::UnexpectedType { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Create a malformed-document error.
    pub fn malformed(offset: usize, detail: impl Into<String>) -> Self {
        Self::Malformed {
            offset,
            detail: detail.into(),
        }
    }

    /// Create an unexpected-type error.
    pub const fn unexpected(offset: usize, expected: &'static str, actual: &'static str) -> Self {
        Self::UnexpectedType {
            offset,
            expected,
            actual,
        }
    }

    /// Wrap a failed property read with the property's name.
    pub fn property(name: impl Into<String>, cause: FlowpackError) -> Self {
        Self::PropertyDecode {
            property: name.into(),
            source: Box::new(cause),
        }
    }

    /// Create an unknown-enum-value error from the decoded text and the
    /// declared constant list.
    pub fn unknown_enum(value: impl Into<String>, constants: &[impl AsRef<str>]) -> Self {
        let expected = constants
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(", ");
        Self::UnknownEnumValue {
            value: value.into(),
            expected,
        }
    }

    /// Create a mapping-expression rejection.
    pub fn mapping_expression(expression: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidMappingExpression {
            expression: expression.into(),
            detail: detail.into(),
        }
    }

    /// Create an unsupported-value error.
    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::Unsupported {
            detail: detail.into(),
        }
    }
}

/// Result type alias using `FlowpackError`.
pub type Result<T> = std::result::Result<T, FlowpackError>;
