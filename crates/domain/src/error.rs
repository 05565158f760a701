//! Domain error types.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::order::OrderError;
use crate::user::AccountError;

/// Coarse classification shared by every error in the system.
///
/// Outer layers use it to pick a response without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A user, book, cart line or order does not exist.
    NotFound,
    /// The request itself is malformed (empty cart, bad quantity, bad status).
    Validation,
    /// The request conflicts with current state (stock, guarded transitions).
    Conflict,
    /// Stored data references something that no longer exists.
    Integrity,
    /// Infrastructure failure.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Integrity => "integrity",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any business-rule violation raised by the domain layer.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Account(#[from] AccountError),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Order(e) => e.kind(),
            DomainError::Catalog(e) => e.kind(),
            DomainError::Account(e) => e.kind(),
        }
    }
}
