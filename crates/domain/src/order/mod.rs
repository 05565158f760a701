//! Order aggregate and related types.

mod aggregate;
mod state;
mod value_objects;

pub use aggregate::{Order, OrderParts, StatusChange};
pub use state::{CancellationPolicy, OrderStatus, Transition};
pub use value_objects::{CheckoutRequest, LineItemDraft, OrderLineItem};

use common::{BookId, OrderId};
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during checkout and order status changes.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The user's cart has no items.
    #[error("Cart is empty, nothing to check out")]
    EmptyCart,

    /// A required checkout field is blank.
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// The requested status does not name a known status.
    #[error("Unsupported order status: {value:?}")]
    InvalidStatus { value: String },

    /// A paid order cannot be cancelled without the elevated override.
    #[error("Order {order_id} is already paid; paid orders require refund workflow")]
    IllegalCancellation { order_id: OrderId },

    /// A cancelled order cannot move to any other status.
    #[error("Order {order_id} is cancelled and cannot move to {requested}")]
    OrderFinalized {
        order_id: OrderId,
        requested: OrderStatus,
    },

    /// A line subtotal or the order total does not fit a money amount.
    #[error("Order amount exceeds the supported range")]
    AmountOverflow,

    /// The book is off sale or has fewer copies than requested.
    #[error("{title} is out of stock or no longer on sale (stock: {stock})")]
    InsufficientStock {
        book_id: BookId,
        title: String,
        stock: u32,
        requested: u32,
    },
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::EmptyCart
            | OrderError::MissingField { .. }
            | OrderError::InvalidStatus { .. }
            | OrderError::AmountOverflow => ErrorKind::Validation,
            OrderError::IllegalCancellation { .. }
            | OrderError::OrderFinalized { .. }
            | OrderError::InsufficientStock { .. } => ErrorKind::Conflict,
        }
    }
}
