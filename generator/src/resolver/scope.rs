use std::collections::HashSet;

use crate::error::ResolveError;
use crate::naming::disambiguate;

/// A set of names that must stay unique, e.g. the fields of one record.
///
/// Lives for the resolution of a single descriptor and is dropped afterwards.
#[derive(Clone, Debug)]
pub(super) struct Scope {
    description: String,
    reserved: HashSet<String>,
}

impl Scope {
    pub(super) fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            reserved: HashSet::new(),
        }
    }

    /// A scope in which `enclosing` (the name of the declaration that owns the scope) is already
    /// taken.
    pub(super) fn enclosed_by(description: impl Into<String>, enclosing: &str) -> Self {
        let mut scope = Self::new(description);
        scope.reserved.insert(enclosing.to_string());
        scope
    }

    /// Claims `candidate`, or its disambiguated form if it is taken.
    pub(super) fn reserve(&mut self, candidate: &str) -> Result<String, ResolveError> {
        let name =
            disambiguate(candidate, &self.reserved).ok_or_else(|| ResolveError::NameCollision {
                name: candidate.to_string(),
                scope: self.description.clone(),
            })?;
        self.reserved.insert(name.clone());
        Ok(name)
    }
}
