//! Domain layer for the bookstore backend.
//!
//! This crate holds the pure business rules, free of any I/O:
//! - Inventory records (`Book`) and their two stock mutation paths
//! - Cart lines and their quantity invariant
//! - The split user identity (`Profile` / `Credential`)
//! - The `Order` aggregate with its status state machine
//! - Reader reviews (`Review`)

pub mod cart;
pub mod catalog;
pub mod error;
pub mod order;
pub mod review;
pub mod user;

pub use cart::CartItem;
pub use catalog::{Book, BookDetails, CatalogError, Language, MAX_PRICE};
pub use error::{DomainError, ErrorKind};
pub use order::{
    CancellationPolicy, CheckoutRequest, LineItemDraft, Order, OrderError, OrderLineItem,
    OrderParts, OrderStatus, StatusChange, Transition,
};
pub use review::{RATING_RANGE, Review};
pub use user::{Account, AccountError, Credential, Profile, Role};
