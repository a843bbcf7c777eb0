use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Why a source file could not be scanned. Positions are byte offsets.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected {expected} at byte {pos}, found {found}")]
    Expected {
        pos: usize,
        expected: String,
        found: String,
    },

    /// Input ended inside an element, expression or template literal
    #[error("{construct} opened at byte {pos} is never closed")]
    Unclosed { pos: usize, construct: String },

    #[error("</{found}> at byte {pos} does not close <{open}>")]
    MismatchedClose {
        pos: usize,
        open: String,
        found: String,
    },
}

impl ParseError {
    pub fn expected(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Expected {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unclosed(pos: usize, construct: impl Into<String>) -> Self {
        Self::Unclosed {
            pos,
            construct: construct.into(),
        }
    }

    pub fn mismatched_close(pos: usize, open: impl Into<String>, found: impl Into<String>) -> Self {
        Self::MismatchedClose {
            pos,
            open: open.into(),
            found: found.into(),
        }
    }
}
