use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{BookId, CartItemId, OrderId, UserId};
use domain::{Account, Book, CartItem, Credential, Order, Profile, Review};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    BookQuery, OrderQuery, Result, StoreError,
    store::{Store, Transaction},
};

/// Failures the in-memory store can be told to produce.
#[derive(Debug, Clone, Default)]
struct Faults {
    /// Book updates allowed per transaction before the next one fails.
    book_writes_before_failure: Option<usize>,
    fail_status_writes: bool,
    fail_order_inserts: bool,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    profiles: HashMap<UserId, Profile>,
    credentials: HashMap<String, Credential>,
    books: HashMap<BookId, Book>,
    /// Every cart line of every user, in insertion order.
    cart: Vec<CartItem>,
    /// Orders in insertion order.
    orders: Vec<Order>,
    /// Reviews in insertion order.
    reviews: Vec<Review>,
    /// Committed `save_book` calls per book.
    book_writes: HashMap<BookId, usize>,
    faults: Faults,
}

impl MemoryState {
    fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| order.id() == id)
    }

    fn account(&self, id: UserId) -> Option<Account> {
        let profile = self.profiles.get(&id)?;
        let credential = self.credentials.values().find(|c| c.user_id == id)?;
        Some(Account {
            profile: profile.clone(),
            credential: credential.clone(),
        })
    }

    fn user_cart(&self, user_id: UserId) -> Vec<CartItem> {
        self.cart
            .iter()
            .filter(|item| item.user_id() == user_id)
            .cloned()
            .collect()
    }
}

/// In-memory store implementation for tests and single-process deployments.
///
/// Transactions are serialized: [`Store::begin`] takes an owned lock on the
/// whole state, so every row a transaction reads is implicitly locked. Writes
/// are staged on a copy that replaces the committed state on commit.
///
/// Reading through the store itself while holding a transaction in the same
/// task waits for that transaction to finish.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed updates to a book's row.
    pub async fn book_write_count(&self, id: BookId) -> usize {
        self.state
            .lock()
            .await
            .book_writes
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Makes every transaction fail its book update after `writes` successful ones.
    pub async fn fail_book_writes_after(&self, writes: usize) {
        self.state.lock().await.faults.book_writes_before_failure = Some(writes);
    }

    /// Makes order status updates fail.
    pub async fn fail_status_writes(&self, fail: bool) {
        self.state.lock().await.faults.fail_status_writes = fail;
    }

    /// Makes order inserts fail.
    pub async fn fail_order_inserts(&self, fail: bool) {
        self.state.lock().await.faults.fail_order_inserts = fail;
    }

    /// Clears every injected failure.
    pub async fn clear_faults(&self) {
        self.state.lock().await.faults = Faults::default();
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(InMemoryTransaction {
            guard,
            staged,
            book_writes: 0,
        })
    }

    async fn find_user(&self, id: UserId) -> Result<Option<Profile>> {
        Ok(self.state.lock().await.profiles.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let state = self.state.lock().await;
        Ok(state
            .credentials
            .get(email)
            .and_then(|credential| state.profiles.get(&credential.user_id))
            .cloned())
    }

    async fn find_account(&self, id: UserId) -> Result<Option<Account>> {
        Ok(self.state.lock().await.account(id))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let state = self.state.lock().await;
        let mut accounts: Vec<_> = state
            .profiles
            .keys()
            .filter_map(|id| state.account(*id))
            .collect();
        accounts.sort_by(|a, b| a.email().cmp(b.email()));
        Ok(accounts)
    }

    async fn find_book(&self, id: BookId) -> Result<Option<Book>> {
        Ok(self.state.lock().await.books.get(&id).cloned())
    }

    async fn list_books(&self, query: BookQuery) -> Result<Vec<Book>> {
        let state = self.state.lock().await;
        let mut books: Vec<_> = state
            .books
            .values()
            .filter(|book| query.matches(book))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title().cmp(b.title()).then(a.id().cmp(&b.id())));
        Ok(books)
    }

    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>> {
        Ok(self.state.lock().await.user_cart(user_id))
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.lock().await.order(id).cloned())
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        let mut orders: Vec<_> = state
            .orders
            .iter()
            .rev()
            .filter(|order| query.matches(order))
            .cloned()
            .collect();
        // Stable sort keeps the later insert first when timestamps tie.
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    async fn reviews_for_book(&self, book_id: BookId) -> Result<Vec<Review>> {
        let state = self.state.lock().await;
        let mut reviews: Vec<_> = state
            .reviews
            .iter()
            .rev()
            .filter(|review| review.book_id() == book_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(reviews)
    }
}

/// A serialized unit of work over [`InMemoryStore`].
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    book_writes: usize,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn find_user(&mut self, id: UserId) -> Result<Option<Profile>> {
        Ok(self.staged.profiles.get(&id).cloned())
    }

    async fn insert_user(&mut self, profile: &Profile, credential: &Credential) -> Result<()> {
        if self.staged.credentials.contains_key(&credential.email) {
            return Err(StoreError::Duplicate {
                entity: "credential",
                key: credential.email.clone(),
            });
        }
        if self.staged.profiles.contains_key(&profile.id) {
            return Err(StoreError::Duplicate {
                entity: "user",
                key: profile.id.to_string(),
            });
        }
        self.staged.profiles.insert(profile.id, profile.clone());
        self.staged
            .credentials
            .insert(credential.email.clone(), credential.clone());
        Ok(())
    }

    async fn find_account_for_update(&mut self, id: UserId) -> Result<Option<Account>> {
        Ok(self.staged.account(id))
    }

    async fn save_account(&mut self, account: &Account) -> Result<()> {
        let id = account.id();
        let (Some(profile), Some(credential)) = (
            self.staged.profiles.get_mut(&id),
            self.staged.credentials.get_mut(account.email()),
        ) else {
            return Err(StoreError::Conflict(format!("account {id} vanished")));
        };
        profile.display_name = account.profile.display_name.clone();
        profile.role = account.profile.role;
        credential.active = account.credential.active;
        Ok(())
    }

    async fn find_book_for_update(&mut self, id: BookId) -> Result<Option<Book>> {
        Ok(self.staged.books.get(&id).cloned())
    }

    async fn insert_book(&mut self, book: &Book) -> Result<()> {
        let isbn = &book.details().isbn;
        if self.staged.books.values().any(|b| &b.details().isbn == isbn) {
            return Err(StoreError::Duplicate {
                entity: "book",
                key: isbn.clone(),
            });
        }
        self.staged.books.insert(book.id(), book.clone());
        Ok(())
    }

    async fn save_book(&mut self, book: &Book) -> Result<()> {
        if let Some(allowed) = self.staged.faults.book_writes_before_failure
            && self.book_writes >= allowed
        {
            return Err(StoreError::Unavailable(format!(
                "book write refused for {}",
                book.id()
            )));
        }
        let isbn = &book.details().isbn;
        if self
            .staged
            .books
            .values()
            .any(|b| b.id() != book.id() && &b.details().isbn == isbn)
        {
            return Err(StoreError::Duplicate {
                entity: "book",
                key: isbn.clone(),
            });
        }
        let Some(slot) = self.staged.books.get_mut(&book.id()) else {
            return Err(StoreError::Conflict(format!("book {} vanished", book.id())));
        };
        *slot = book.clone();
        self.book_writes += 1;
        *self.staged.book_writes.entry(book.id()).or_default() += 1;
        Ok(())
    }

    async fn cart_items_for_update(&mut self, user_id: UserId) -> Result<Vec<CartItem>> {
        Ok(self.staged.user_cart(user_id))
    }

    async fn save_cart_item(&mut self, item: &CartItem) -> Result<()> {
        if let Some(existing) = self.staged.cart.iter_mut().find(|i| i.id() == item.id()) {
            *existing = item.clone();
            return Ok(());
        }
        if self
            .staged
            .cart
            .iter()
            .any(|i| i.user_id() == item.user_id() && i.book_id() == item.book_id())
        {
            return Err(StoreError::Duplicate {
                entity: "cart item",
                key: format!("{}/{}", item.user_id(), item.book_id()),
            });
        }
        self.staged.cart.push(item.clone());
        Ok(())
    }

    async fn delete_cart_items(&mut self, ids: &[CartItemId]) -> Result<()> {
        let before = self.staged.cart.len();
        self.staged.cart.retain(|item| !ids.contains(&item.id()));
        let deleted = before - self.staged.cart.len();
        if deleted != ids.len() {
            return Err(StoreError::Conflict(format!(
                "expected to delete {} cart items, deleted {deleted}",
                ids.len()
            )));
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        if self.staged.faults.fail_order_inserts {
            return Err(StoreError::Unavailable(format!(
                "order insert refused for {}",
                order.id()
            )));
        }
        if self.staged.order(order.id()).is_some() {
            return Err(StoreError::Duplicate {
                entity: "order",
                key: order.id().to_string(),
            });
        }
        self.staged.orders.push(order.clone());
        Ok(())
    }

    async fn find_order_for_update(&mut self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.staged.order(id).cloned())
    }

    async fn save_order_status(&mut self, order: &Order) -> Result<()> {
        if self.staged.faults.fail_status_writes {
            return Err(StoreError::Unavailable(format!(
                "status write refused for {}",
                order.id()
            )));
        }
        let Some(stored) = self
            .staged
            .orders
            .iter_mut()
            .find(|stored| stored.id() == order.id())
        else {
            return Err(StoreError::Conflict(format!("order {} vanished", order.id())));
        };
        *stored = order.clone();
        Ok(())
    }

    async fn insert_review(&mut self, review: &Review) -> Result<()> {
        if !self.staged.books.contains_key(&review.book_id())
            || !self.staged.profiles.contains_key(&review.user_id())
        {
            return Err(StoreError::Conflict(format!(
                "review {} references a missing book or user",
                review.id()
            )));
        }
        self.staged.reviews.push(review.clone());
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let InMemoryTransaction {
            mut guard, staged, ..
        } = self;
        *guard = staged;
        Ok(())
    }
}
