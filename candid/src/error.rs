use thiserror::Error;

use crate::CandidId;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("the input does not contain any tokens")]
    EmptyInput,
    #[error("quoted text starting at byte {start} is not terminated")]
    UnterminatedText { start: usize },
    #[error("quoted text starting at byte {start} contains whitespace")]
    WhitespaceInQuotedText { start: usize },
    #[error("unexpected end of the token stream")]
    UnexpectedEnd,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("expected {expected}, found {found:?}")]
    Unexpected {
        expected: &'static str,
        found: String,
    },
    #[error("expected {expected}, but the input ended")]
    UnexpectedEnd { expected: &'static str },
    #[error("unknown type {0:?}")]
    UnknownType(String),
    #[error("field {field} is declared more than once in the same {container}")]
    DuplicateField {
        field: CandidId,
        container: &'static str,
    },
    #[error("type {0} is declared more than once")]
    DuplicateType(CandidId),
    #[error("method {0:?} is declared more than once")]
    DuplicateMethod(String),
    #[error("type {0} is used as a service but is not one")]
    NotAService(CandidId),
    #[error("type {0} is used as a method signature but is not a function")]
    NotAFunction(CandidId),
    #[error("the file does not declare a service")]
    MissingService,
    #[error("imports are not supported ({0})")]
    UnsupportedImport(String),
}
