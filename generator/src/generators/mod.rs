mod common;

#[cfg(feature = "generator-rust")]
mod rust;
#[cfg(feature = "generator-typescript")]
mod typescript;

#[cfg(not(any(feature = "generator-rust", feature = "generator-typescript")))]
compile_error!("At least one generator must be enabled");

use clap::ValueEnum;

use crate::binding::Bindings;
use crate::error::EmitError;

pub use common::{Artifact, ArtifactKind, EmitOptions};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Generator {
    #[cfg(feature = "generator-rust")]
    Rust,
    #[cfg(feature = "generator-typescript")]
    Typescript,
}

impl Default for Generator {
    #[cfg(feature = "generator-rust")]
    fn default() -> Self {
        Self::Rust
    }

    #[cfg(not(feature = "generator-rust"))]
    fn default() -> Self {
        Self::Typescript
    }
}

impl Generator {
    pub fn generate(
        &self,
        bindings: &Bindings,
        options: &EmitOptions,
    ) -> Result<Vec<Artifact>, EmitError> {
        match *self {
            #[cfg(feature = "generator-rust")]
            Self::Rust => rust::generate(bindings, options),
            #[cfg(feature = "generator-typescript")]
            Self::Typescript => typescript::generate(bindings, options),
        }
    }
}
