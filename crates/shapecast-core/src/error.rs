//! # Raised Error Types
//!
//! Two errors are ever raised to the caller, and both are ordinary
//! `Result` errors, never panics:
//!
//! - [`SchemaError`] at definition time, from the few constructors
//!   that can reject a malformed composition (dictionary key schemas,
//!   record refinements).
//! - [`ValidationError`] from [`Schema::check`](crate::Schema::check),
//!   wrapping the [`Failure`] that `validate` would have returned.

use thiserror::Error;

use crate::result::Failure;

/// A schema was composed in a way that can never validate anything.
///
/// These surface at construction, not at validation: `validate` itself
/// never fails with a `SchemaError`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Dictionary keys must describe strings or numbers.
    #[error("invalid dictionary key schema {shown}: keys must describe strings or numbers")]
    InvalidKeySchema {
        /// The rendered offending key schema.
        shown: String,
    },
    /// A record refinement (`pick`, `omit`, `as_partial`) was applied
    /// to a schema of a different kind.
    #[error("cannot {operation} a {kind} schema")]
    UnsupportedRefinement {
        /// The refinement that was attempted.
        operation: &'static str,
        /// The kind it was attempted on.
        kind: &'static str,
    },
    /// `pick` or `omit` named a field the record does not declare.
    #[error("record has no field named {0:?}")]
    UnknownField(String),
}

/// A raised validation failure, produced only by
/// [`Schema::check`](crate::Schema::check) as a convenience over the
/// returned [`Failure`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{failure}")]
pub struct ValidationError {
    /// The underlying failure, with message, key and full error tree.
    pub failure: Failure,
}

impl ValidationError {
    /// The failure message.
    pub fn message(&self) -> &str {
        &self.failure.message
    }

    /// The key path, when the failure is located inside a structure.
    pub fn key(&self) -> Option<&str> {
        self.failure.key.as_deref()
    }
}

impl From<Failure> for ValidationError {
    fn from(failure: Failure) -> ValidationError {
        ValidationError { failure }
    }
}
