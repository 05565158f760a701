//! Order checkout and lifecycle services.
//!
//! - [`CheckoutEngine`] turns a user's cart into a `Pending` order in one
//!   transaction, decrementing stock line by line
//! - [`StatusMachine`] applies status changes and restores stock on cancellation
//! - [`OrderService`] is the facade the HTTP layer talks to
//!
//! [`CatalogService`], [`CartService`] and [`AccountService`] cover the data
//! the checkout consumes; [`ReviewService`] records reader ratings.

pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod reviews;
pub mod service;
pub mod status;

pub use accounts::AccountService;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use checkout::CheckoutEngine;
pub use error::{Result, ServiceError};
pub use reviews::ReviewService;
pub use service::{CheckoutReceipt, OrderService};
pub use status::StatusMachine;
