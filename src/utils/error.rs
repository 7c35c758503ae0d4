use std::result;

use thiserror::Error;

use crate::{collection::error::CollectionError, options::error::OptionError};

/// A type alias for handling errors related to utop.
pub type Result<T> = result::Result<T, UtopError>;

/// An error that can occur while utop runs.
#[derive(Debug, Error)]
pub enum UtopError {
    /// An error when there is an IO exception.
    #[error("IO exception, {0}")]
    InvalidIo(String),
    /// An error from the process collector that the app can not recover from.
    #[error("Collection error, {0}")]
    Collection(#[from] CollectionError),
    /// An error from the arguments or the config file.
    #[error(transparent)]
    Option(#[from] OptionError),
    /// A bad value typed in by the user. Shown inline and never fatal.
    #[error("{0}")]
    Input(String),
    /// An external action (signal, renice, tool) that failed.
    #[error("{0}")]
    Action(String),
    /// A record was inserted for a pid that is already known.
    #[error("pid {0} is already in the store")]
    DuplicatePid(crate::collection::processes::Pid),
}

impl UtopError {
    /// Create a new [`UtopError::Input`].
    pub(crate) fn input<R: Into<String>>(reason: R) -> Self {
        UtopError::Input(reason.into())
    }

    /// Create a new [`UtopError::Action`].
    pub(crate) fn action<R: Into<String>>(reason: R) -> Self {
        UtopError::Action(reason.into())
    }

    /// Whether this is an error the user caused and can simply acknowledge.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, UtopError::Input(_) | UtopError::Action(_))
    }
}

impl From<std::io::Error> for UtopError {
    fn from(err: std::io::Error) -> Self {
        UtopError::InvalidIo(err.to_string())
    }
}
