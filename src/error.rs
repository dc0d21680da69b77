//! Error types for the flow-control protocol.

use thiserror::Error;

use crate::kind::Kind;

/// The main error type for pipeline attachment.
///
/// Flowing data itself is infallible in this protocol; errors only arise
/// while wiring stages together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An upstream fount's advertised output kind does not satisfy the
    /// downstream pump's declared input kind.
    #[error("kind mismatch: upstream offers `{offered}`, pump requires `{required}`")]
    KindMismatch {
        /// The kind the fount advertises.
        offered: Kind,
        /// The kind the pump requires.
        required: Kind,
    },

    /// A custom error with a message.
    ///
    /// Foreign [`Fount`](crate::traits::Fount) and
    /// [`Drain`](crate::traits::Drain) implementations can use this to
    /// reject an attachment for reasons of their own.
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Create a custom error with a message.
    pub fn custom<S: Into<String>>(message: S) -> Self {
        Error::Custom(message.into())
    }
}

/// Convenience type alias for Results in this crate.
pub type Result<T> = std::result::Result<T, Error>;
