pub mod constants;
pub mod utility;

use serde::{Deserialize, Serialize};

/// A minnowdb result, using the crate-wide error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A minnowdb error. Wire-friendly and cheap to clone so results can flow
/// through iterators and across threads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// The transaction was aborted and must be retried, typically because a
    /// page lock could not be acquired before the deadline.
    Abort,
    /// Invalid data, e.g. a corrupt page image or a schema mismatch.
    InvalidData(String),
    /// Invalid user input, e.g. a bad field index or aggregate operator.
    InvalidInput(String),
    /// API misuse, e.g. pulling from an operator that was never opened.
    InvalidState(String),
    /// An input/output error.
    IO(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Abort => write!(f, "transaction aborted"),
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Error::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            Error::IO(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl Error {
    /// Returns whether the error signals a transaction abort. Callers at a
    /// transaction boundary use this to decide between abort and failure.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Abort)
    }
}

impl<T> From<Error> for Result<T> {
    fn from(error: Error) -> Self {
        Err(error)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IO(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Error::InvalidState(format!("lock poisoned: {err}"))
    }
}

impl From<::config::ConfigError> for Error {
    fn from(err: ::config::ConfigError) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

/// Constructs an `Error::InvalidInput` as an `Err` result with a formatted
/// message.
#[macro_export]
macro_rules! errinput {
    ($($args:tt)*) => {
        Err($crate::common::Error::InvalidInput(format!($($args)*)))
    };
}

/// Constructs an `Error::InvalidData` as an `Err` result with a formatted
/// message.
#[macro_export]
macro_rules! errdata {
    ($($args:tt)*) => {
        Err($crate::common::Error::InvalidData(format!($($args)*)))
    };
}
