//! Model and loader for Candid service descriptions.
//!
//! Text goes through the [`tokenizer`] into the [`parser`], which produces a [`ServiceFile`]: the
//! declared types of a `.did` file plus the service it describes.

pub mod error;
pub mod parser;
pub mod tokenizer;
pub mod types;

mod id;

pub use error::{LexError, ParseError};
pub use id::{idl_hash, CandidId};
pub use parser::parse_service_file;
pub use tokenizer::{tokenize, Token, TokenCursor, TokenKind};
pub use types::{
    CandidType, FuncMode, FuncType, ParameterType, PrimitiveType, RecordType, ServiceFile,
    ServiceType, VariantType,
};
