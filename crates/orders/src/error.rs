//! Service error types.

use common::{BookId, CartItemId, OrderId, UserId};
use domain::{AccountError, CatalogError, DomainError, ErrorKind, OrderError};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur in order, catalog, cart and account operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Book not found: {0}")]
    BookNotFound(BookId),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Cart item not found: {0}")]
    CartItemNotFound(CartItemId),

    /// The account exists but has been deactivated.
    #[error("Account {0} is deactivated")]
    AccountInactive(UserId),

    /// A cart line points at a book that no longer exists.
    #[error("Cart item {cart_item_id} references missing book {book_id}")]
    InvalidCartReference {
        cart_item_id: CartItemId,
        book_id: BookId,
    },

    /// A business rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::UserNotFound(_)
            | ServiceError::BookNotFound(_)
            | ServiceError::OrderNotFound(_)
            | ServiceError::CartItemNotFound(_) => ErrorKind::NotFound,
            ServiceError::AccountInactive(_) => ErrorKind::Conflict,
            ServiceError::InvalidCartReference { .. } => ErrorKind::Integrity,
            ServiceError::Domain(e) => e.kind(),
            ServiceError::Store(e) => e.kind(),
        }
    }

    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ServiceError::UserNotFound(_) => "user_not_found",
            ServiceError::AccountInactive(_) => "account_inactive",
            ServiceError::InvalidCartReference { .. } => "invalid_cart_reference",
            ServiceError::Domain(DomainError::Order(OrderError::EmptyCart)) => "empty_cart",
            ServiceError::Domain(DomainError::Order(OrderError::InsufficientStock { .. })) => {
                "insufficient_stock"
            }
            ServiceError::Domain(DomainError::Order(OrderError::MissingField { .. })) => {
                "invalid_request"
            }
            ServiceError::Store(_) => "store",
            other => other.kind().as_str(),
        }
    }
}

impl From<OrderError> for ServiceError {
    fn from(e: OrderError) -> Self {
        ServiceError::Domain(e.into())
    }
}

impl From<CatalogError> for ServiceError {
    fn from(e: CatalogError) -> Self {
        ServiceError::Domain(e.into())
    }
}

impl From<AccountError> for ServiceError {
    fn from(e: AccountError) -> Self {
        ServiceError::Domain(e.into())
    }
}

/// Convenience type alias for service results.
pub type Result<T> = std::result::Result<T, ServiceError>;
