//! Errors

use thiserror::Error;

use crate::metadata::EntityType;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by section reads and writes.
#[derive(Error, Debug)]
pub enum Error {
    // --- Request errors ---
    /// The requested fields cannot be satisfied by the section metadata.
    ///
    /// Deterministic for a given request and metadata, so never worth retrying.
    #[error("invalid fetch fields query: {0}")]
    InvalidFetchFieldsQuery(String),

    /// The query executed but matched no entries.
    #[error("entry not found")]
    EntryNotFound,

    // --- Configuration errors ---
    /// A section definition breaks a metadata invariant.
    #[error("invalid section: {0}")]
    InvalidSection(String),

    /// No manager is registered for the section and there is no default.
    #[error("no manager found for section {0}")]
    NoManagerFound(EntityType),

    // --- Execution errors ---
    /// Failure reported by the execution layer, passed through unchanged.
    #[error(transparent)]
    Execution(#[from] anyhow::Error),
}

impl Error {
    /// Returns `true` when the error indicates no entries matched.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::EntryNotFound)
    }
}

/// Shorthand for building an [`Error::InvalidFetchFieldsQuery`].
#[macro_export]
macro_rules! invalid_fetch {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::InvalidFetchFieldsQuery(format!($fmt, $($arg)*))
    };
    ($desc:expr $(,)?) => {
        $crate::Error::InvalidFetchFieldsQuery(format!($desc))
    };
}
