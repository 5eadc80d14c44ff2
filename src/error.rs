//! Error types for pattern compilation and match-time misuse.
//!
//! Two families, matching the two failure modes a caller can hit: a bad
//! pattern never produces an engine at all ([`ParseError`]), while a bad
//! runtime call (negative counts, reading an empty match) aborts only the
//! call that made it ([`RuntimeError`]).

use std::ops::Range;

use thiserror::Error;

/// Top level error returned by every public entry point.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// A pattern failed to compile.
///
/// `span` is a byte range into the original pattern string, suitable for
/// underlining in a diagnostic.
#[derive(Debug, Error)]
#[error("{kind} at byte {}..{}", span.start, span.end)]
pub struct ParseError {
    pub span: Range<usize>,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(span: Range<usize>, kind: ParseErrorKind) -> Self {
        Self { span, kind }
    }

    pub fn at(pos: usize, kind: ParseErrorKind) -> Self {
        Self { span: pos..pos, kind }
    }
}

#[derive(Debug, Error)]
pub enum ParseErrorKind {
    #[error("unbalanced parenthesis")]
    UnbalancedParen,
    #[error("unterminated character class")]
    UnterminatedClass,
    #[error("unknown inline flag '{0}'")]
    UnknownFlag(char),
    #[error("invalid group name '{0}'")]
    InvalidGroupName(String),
    #[error("a repetition operator cannot follow another repetition operator")]
    RepeatOnRepeat,
    #[error("a repetition operator must follow an atom")]
    RepeatWithoutAtom,
    #[error("repetition maximum {max} is less than minimum {min}")]
    RepeatRangeOutOfOrder { min: u32, max: u32 },
    #[error("reference to undefined group '{0}'")]
    UnknownGroupReference(String),
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("invalid hexadecimal escape")]
    InvalidHexEscape,
    #[error("invalid control-character escape")]
    InvalidControlEscape,
    #[error("invalid character class")]
    InvalidCharacterClass,
    #[error("a balancing group's left operand '{0}' has no open capture")]
    UnbalancedBalancingGroup(String),
    #[error("empty group name")]
    EmptyGroupName,
    #[error("unexpected end of pattern: {0}")]
    UnexpectedEnd(&'static str),
    #[error("expected '{expected}': {reason}")]
    Expected { expected: String, reason: &'static str },
}

/// A call was made with arguments that are invalid independent of the
/// pattern (negative `count`, reading through an empty match).
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("count must be -1, 0, or positive, got {0}")]
    NegativeCount(i64),
    #[error("cannot read a result from a match that did not succeed")]
    NoMatch,
}
