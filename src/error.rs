//! Error and outcome types shared by every proxy.

use thiserror::Error;

/// Boxed error produced by a wrapped driver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for traced driver operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by traced resources.
///
/// Driver errors pass through untouched inside [`Error::Driver`]; the remaining
/// variants are raised by the proxy layer itself before the driver is reached.
#[derive(Debug, Error)]
pub enum Error {
    /// The fallback path only binds positional arguments.
    #[error("driver does not support the use of named parameters (got `{0}`)")]
    NamedParameterUnsupported(String),

    /// The caller's context was already signaled.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Error returned by the wrapped resource.
    #[error(transparent)]
    Driver(BoxError),

    /// A traced alias was registered twice.
    #[error("driver `{0}` is already registered")]
    AlreadyRegistered(String),

    /// No traced driver is registered under the alias.
    #[error("no traced driver registered as `{0}`")]
    UnknownDriver(String),

    /// A connection string could not be parsed.
    #[error("invalid DSN: {0}")]
    InvalidDsn(String),
}

impl Error {
    /// Wrap an arbitrary driver error.
    pub fn driver(err: impl Into<BoxError>) -> Self {
        Error::Driver(err.into())
    }
}

/// Why a [`CallContext`](crate::CallContext) stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Result of an optional driver capability.
///
/// `Unsupported` tells the caller the resource does not implement the
/// operation and a fallback should be used. It is never a failure and is
/// never traced.
#[derive(Debug)]
pub enum Outcome<T> {
    Unsupported,
    Success(T),
    Failure(Error),
}

impl<T> Outcome<T> {
    /// Whether the resource lacked the capability.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Outcome::Unsupported)
    }

    /// Map the success value, keeping `Unsupported` and failures as they are.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Unsupported => Outcome::Unsupported,
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure(err) => Outcome::Failure(err),
        }
    }

    /// Collapse into a `Result`, with `None` standing for `Unsupported`.
    pub fn into_result(self) -> Result<Option<T>> {
        match self {
            Outcome::Unsupported => Ok(None),
            Outcome::Success(value) => Ok(Some(value)),
            Outcome::Failure(err) => Err(err),
        }
    }

    /// The success value, discarding any error.
    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    /// The failure, if the call failed.
    pub fn err(&self) -> Option<&Error> {
        match self {
            Outcome::Failure(err) => Some(err),
            _ => None,
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Failure(err),
        }
    }
}
