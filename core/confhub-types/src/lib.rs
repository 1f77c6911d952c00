//! Core type definitions for Confhub.
//!
//! This crate defines the small set of types shared by every other crate:
//! - Client identifiers, used as the owner of settings scripts
//! - The crate-level error and result aliases
//!
//! Setting and schema types live in `confhub-model`.

mod ids;

pub use ids::ClientId;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid client id {input:?}: {source}")]
    InvalidClientId {
        input: String,
        #[source]
        source: uuid::Error,
    },
}
