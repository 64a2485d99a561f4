use std::fmt;

use rowan::TextRange;
use serde::Serialize;

/// An error raised while reading a syntax tree dump.
///
/// The reader stops at the first error; the range points at the offending
/// text in the dump.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadError {
    pub kind: ReadErrorKind,
    #[serde(skip)]
    pub range: TextRange,
}

impl ReadError {
    pub fn new(kind: ReadErrorKind, range: TextRange) -> Self {
        Self { kind, range }
    }
}

/// The specific kind of reader error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ReadErrorKind {
    /// An unexpected character was encountered.
    UnexpectedCharacter(char),
    /// Input ended inside a list, string or annotation.
    UnexpectedEof,
    /// A `)` without a matching `(`.
    UnbalancedParen,
    /// A list whose head is not a known node kind.
    UnknownNodeKind(String),
    /// A string literal contained an invalid escape.
    InvalidEscapeSequence(char),
    /// A number could not be parsed.
    InvalidNumberLiteral(String),
    /// An annotation comment did not follow the annotation grammar.
    InvalidAnnotation(String),
    /// Extra input after the root node.
    TrailingInput,
}

impl fmt::Display for ReadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter(c) => write!(f, "unexpected character: {c:?}"),
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::UnbalancedParen => write!(f, "unbalanced `)`"),
            Self::UnknownNodeKind(k) => write!(f, "unknown node kind: {k}"),
            Self::InvalidEscapeSequence(c) => write!(f, "invalid escape sequence: \\{c}"),
            Self::InvalidNumberLiteral(s) => write!(f, "invalid number literal: {s}"),
            Self::InvalidAnnotation(s) => write!(f, "invalid annotation: {s}"),
            Self::TrailingInput => write!(f, "unexpected input after the root node"),
        }
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for ReadError {}
