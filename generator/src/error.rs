use dt_candid::{CandidId, ParseError};
use thiserror::Error;

/// Why a service description could not be turned into bindings.
///
/// `path` fields locate the offending declaration, e.g. `Account.owner` or `ledger.transfer.arg0`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("{path}: reference to undeclared type {id}")]
    UnresolvedReference { id: CandidId, path: String },
    #[error("alias {alias} cannot be expressed without a named type: {reason}")]
    UnaliasableTarget { alias: String, reason: String },
    #[error("{path}: {construct} is not supported here")]
    UnsupportedConstruct { construct: String, path: String },
    #[error("name {name} collides with another name in {scope}")]
    NameCollision { name: String, scope: String },
    #[error("the service name {0:?} is not a usable identifier")]
    InvalidServiceName(String),
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("{name:?} cannot be used as an identifier")]
    InvalidIdentifier { name: String },
    #[error("{path:?} is not a valid module path")]
    InvalidPath { path: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse the service description")]
    Parse(#[from] ParseError),
    #[error("failed to resolve bindings")]
    Resolve(#[from] ResolveError),
    #[error("failed to emit bindings")]
    Emit(#[from] EmitError),
}
