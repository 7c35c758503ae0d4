//! Error code related to process collection.

use thiserror::Error;

use crate::collection::processes::Pid;

/// A type alias for handling collection-related errors.
pub type CollectionResult<T> = std::result::Result<T, CollectionError>;

/// The errors that can happen with process collection.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// The process went away. This is expected and never shown to the user.
    #[error("process {0} no longer exists")]
    NotFound(Pid),
    /// A generic error.
    #[error(transparent)]
    General(#[from] anyhow::Error),
}

impl CollectionError {
    /// Whether this error just means the process is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CollectionError::NotFound(_))
    }
}

impl From<std::io::Error> for CollectionError {
    fn from(err: std::io::Error) -> Self {
        Self::General(err.into())
    }
}

impl From<&'static str> for CollectionError {
    fn from(msg: &'static str) -> Self {
        Self::General(anyhow::anyhow!(msg))
    }
}
