//! Read model view implementations.

pub mod account;
pub mod cart;
pub mod order;
pub mod review;

pub use account::AccountView;
pub use cart::{CartLineView, CartView};
pub use order::{LineItemView, OrderDetail, OrderSummary, UNKNOWN_PAYMENT};
pub use review::{ANONYMOUS_REVIEWER, ReviewView};
