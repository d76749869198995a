use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

pub type SelectorResult<T> = Result<T, SelectorError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected end of input at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Unterminated comment starting at {pos}")]
    UnterminatedComment { pos: usize },

    #[error("Invalid syntax at {pos}: {message}")]
    InvalidSyntax { pos: usize, message: String },
}

impl ParseError {
    pub fn unexpected_eof(pos: usize) -> Self {
        Self::UnexpectedEof { pos }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Unrecognized character in selector at {pos}")]
    LexerError { pos: usize },

    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of selector: expected {expected}")]
    UnexpectedEnd { expected: String },

    #[error("Unsupported selector feature at {pos}: {feature}")]
    Unsupported { pos: usize, feature: String },
}

impl SelectorError {
    pub fn unexpected_token(
        pos: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_end(expected: impl Into<String>) -> Self {
        Self::UnexpectedEnd {
            expected: expected.into(),
        }
    }

    pub fn unsupported(pos: usize, feature: impl Into<String>) -> Self {
        Self::Unsupported {
            pos,
            feature: feature.into(),
        }
    }
}
