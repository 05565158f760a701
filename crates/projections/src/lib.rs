//! Read models for the query side.
//!
//! Views are plain serializable values built from domain entities:
//! - [`OrderSummary`] for order lists
//! - [`OrderDetail`] with its [`LineItemView`]s for a single order
//! - [`CartView`] for a user's cart priced at current catalog prices
//! - [`ReviewView`] for a book's reviews
//! - [`AccountView`] for the administrators' user list

pub mod views;

pub use views::{
    ANONYMOUS_REVIEWER, AccountView, CartLineView, CartView, LineItemView, OrderDetail,
    OrderSummary, ReviewView, UNKNOWN_PAYMENT,
};
