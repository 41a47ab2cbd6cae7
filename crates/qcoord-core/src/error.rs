use thiserror::Error;

use crate::id::{FragmentId, ObjectId};

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type collaborators hand back from their calls.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures a coordination run can report.
///
/// Internal invariant violations are not represented here; they panic.
#[derive(Debug, Error)]
pub enum Error {
    /// A splittable split was split into nothing.
    #[error("Input {0} is empty")]
    InputEmpty(ObjectId),

    #[error("Collaborator call `{call}` failed")]
    Collaborator {
        call: &'static str,
        #[source]
        source: BoxError,
    },

    /// Wrapper returned from a coordination run.
    #[error("Failed to coordinate plan fragment {fragment}")]
    Coordinate {
        fragment: FragmentId,
        #[source]
        source: Box<Error>,
    },

    #[error("Hashing error: {0}")]
    Hash(String),
}

impl Error {
    pub fn collaborator(call: &'static str, source: BoxError) -> Self {
        Error::Collaborator { call, source }
    }

    /// Innermost coordinator error, looking through `Coordinate` wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Coordinate { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_input_empty(&self) -> bool {
        matches!(self.root(), Error::InputEmpty(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}
