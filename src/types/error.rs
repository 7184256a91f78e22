use std::sync::Arc;

use thiserror::Error;

/// The error type for this crate.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A configuration parameter is outside its declared range. Aborts the whole run.
    #[error("Config error: {0}")]
    Config(String),
    /// The identification graph violates a structural invariant, e.g. a PSM with zero
    /// evidences, or a protein group whose members disagree on score. A normalization by
    /// zero during message passing, meaning the model has assigned zero probability mass
    /// everywhere, is folded into this variant too. Aborts only the offending connected
    /// component; other components continue.
    #[error("Structural error: {0}")]
    Structural(String),
    /// Another, externally supplied error that occurred while driving the inference.
    #[error(transparent)]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for Error {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Other(Arc::from(err))
    }
}

/// A specialized [`Result`] type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
