//! Transactional persistence for users, catalog, carts and orders.
//!
//! All writes happen inside a [`Transaction`] obtained from [`Store::begin`];
//! dropping a transaction without committing rolls it back.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTransaction};
pub use postgres::{PgTransaction, PostgresStore};
pub use query::{BookQuery, OrderQuery};
pub use store::{Store, Transaction};
