//! Shared identifiers and money type for the bookstore backend.

mod money;
mod types;

pub use money::Money;
pub use types::{BookId, CartItemId, LineItemId, OrderId, ReviewId, UserId};
