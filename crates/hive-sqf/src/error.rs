//! Error types for SQF parsing and value coercion.

use crate::value::ValueKind;

/// Why a piece of SQF text could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input ended in the middle of a value.
    UnexpectedEnd,
    /// A character that cannot start or continue a value here.
    UnexpectedChar(char),
    /// A numeric literal that does not fit any numeric variant.
    InvalidNumber(String),
    /// A bare word that is not `true` or `false`.
    UnknownLiteral(String),
    /// A complete value was followed by more input.
    TrailingInput,
}

impl core::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnexpectedEnd => write!(f, "unexpected end of input"),
            Self::UnexpectedChar(c) => write!(f, "unexpected character {c:?}"),
            Self::InvalidNumber(text) => write!(f, "invalid number {text:?}"),
            Self::UnknownLiteral(text) => write!(f, "unknown literal {text:?}"),
            Self::TrailingInput => write!(f, "trailing input after value"),
        }
    }
}

/// Malformed SQF text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid SQF at byte {offset}: {kind}")]
pub struct ParseError {
    /// Byte offset into the input where parsing failed.
    pub offset: usize,
    /// What went wrong.
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) const fn new(offset: usize, kind: ParseErrorKind) -> Self {
        Self { offset, kind }
    }
}

/// A well-formed value of the wrong kind for the requested coercion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoercionError {
    /// The value's variant cannot be converted to the requested type.
    #[error("cannot read {found} as {expected}")]
    Unsupported {
        /// The type the caller asked for.
        expected: &'static str,
        /// The variant that was actually present.
        found: ValueKind,
    },

    /// The value is numeric but outside the requested range.
    #[error("{value} is out of range for {expected}")]
    OutOfRange {
        /// The type the caller asked for.
        expected: &'static str,
        /// Textual form of the offending value.
        value: String,
    },
}
