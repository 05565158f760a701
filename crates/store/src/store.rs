use async_trait::async_trait;
use common::{BookId, CartItemId, OrderId, UserId};
use domain::{Account, Book, CartItem, Credential, Order, Profile, Review};

use crate::{BookQuery, OrderQuery, Result};

/// Core trait for store implementations.
///
/// Reads outside a transaction see committed state only. Every write goes
/// through a [`Transaction`]. All implementations must be thread-safe.
#[async_trait]
pub trait Store: Send + Sync {
    /// The unit of work type handed out by [`Store::begin`].
    type Tx: Transaction + 'static;

    /// Starts a new unit of work.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Resolves a user profile.
    async fn find_user(&self, id: UserId) -> Result<Option<Profile>>;

    /// Resolves a user profile by the (normalized) login email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<Profile>>;

    /// Resolves both halves of a user.
    async fn find_account(&self, id: UserId) -> Result<Option<Account>>;

    /// Lists every account, sorted by email.
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Retrieves a book by id, on sale or not.
    async fn find_book(&self, id: BookId) -> Result<Option<Book>>;

    /// Lists books matching a query, sorted by title.
    async fn list_books(&self, query: BookQuery) -> Result<Vec<Book>>;

    /// Retrieves a user's cart in iteration order (oldest line first).
    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>>;

    /// Retrieves an order with all of its line items.
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists orders matching a query, newest first.
    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>>;

    /// Lists the reviews of a book, newest first.
    async fn reviews_for_book(&self, book_id: BookId) -> Result<Vec<Review>>;
}

/// A unit of work against the store.
///
/// Rows read through the `*_for_update` methods stay locked against other
/// transactions until this one commits or is dropped. Dropping without
/// calling [`Transaction::commit`] discards every write.
#[async_trait]
pub trait Transaction: Send {
    async fn find_user(&mut self, id: UserId) -> Result<Option<Profile>>;

    /// Inserts a profile and its credential. Fails with `Duplicate` if the email is taken.
    async fn insert_user(&mut self, profile: &Profile, credential: &Credential) -> Result<()>;

    async fn find_account_for_update(&mut self, id: UserId) -> Result<Option<Account>>;

    /// Persists display name, role and the active flag. Email and hash never change here.
    async fn save_account(&mut self, account: &Account) -> Result<()>;

    async fn find_book_for_update(&mut self, id: BookId) -> Result<Option<Book>>;

    /// Inserts a new book. Fails with `Duplicate` if the ISBN is taken.
    async fn insert_book(&mut self, book: &Book) -> Result<()>;

    /// Persists the current state of an existing book, stock included.
    async fn save_book(&mut self, book: &Book) -> Result<()>;

    /// Locks and returns a user's cart in iteration order.
    async fn cart_items_for_update(&mut self, user_id: UserId) -> Result<Vec<CartItem>>;

    /// Inserts or updates a cart line. At most one line per (user, book).
    async fn save_cart_item(&mut self, item: &CartItem) -> Result<()>;

    /// Deletes cart lines. Fails with `Conflict` if any of them is already gone.
    async fn delete_cart_items(&mut self, ids: &[CartItemId]) -> Result<()>;

    /// Inserts an order together with its line items.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    async fn find_order_for_update(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Persists the status of an existing order. Nothing else about an order is mutable.
    async fn save_order_status(&mut self, order: &Order) -> Result<()>;

    async fn insert_review(&mut self, review: &Review) -> Result<()>;

    /// Makes every write of this unit of work visible atomically.
    async fn commit(self) -> Result<()>;
}
