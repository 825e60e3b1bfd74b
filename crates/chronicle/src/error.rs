use crate::{
    config::ConfigError,
    query::{ExecutorError, QueryError},
    response::ResponseError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Public error surface. Every fallible operation in the crate funnels
/// into one of these variants.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Query(#[from] QueryError),

    #[error("{0}")]
    Response(#[from] ResponseError),

    /// Failure reported by the external query executor, passed through as-is.
    #[error("{0}")]
    Executor(#[from] ExecutorError),

    #[error("{0}")]
    Internal(#[from] InternalError),
}

impl Error {
    /// Classification of the failure, if it came from the core itself.
    #[must_use]
    pub const fn class(&self) -> Option<ErrorClass> {
        match self {
            Self::Internal(err) => Some(err.class),
            Self::Query(QueryError::NotVersioned { .. }) => Some(ErrorClass::Unsupported),
            Self::Response(ResponseError::NonUniqueResult { .. }) => Some(ErrorClass::Conflict),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::Internal(InternalError {
                class: ErrorClass::Corruption,
                ..
            })
        )
    }
}

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Corruption-class errors signal audit-trail data integrity failures and
/// must never be swallowed.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct a diff-origin corruption error (element or id could not be encoded).
    pub(crate) fn diff_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Diff, message)
    }

    /// Construct a materialize-origin corruption error (malformed audit row).
    pub(crate) fn materialize_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Materialize, message)
    }

    /// Construct a collection-origin invariant violation.
    pub(crate) fn collection_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Collection,
            message,
        )
    }

    /// Construct a query-origin invariant violation.
    pub(crate) fn query_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Query, message)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    Internal,
    Conflict,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::Internal => "internal",
            Self::Conflict => "conflict",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Diff,
    Collection,
    Query,
    Materialize,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Diff => "diff",
            Self::Collection => "collection",
            Self::Query => "query",
            Self::Materialize => "materialize",
        };
        write!(f, "{label}")
    }
}
