//! Cart-to-order conversion.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use common::{BookId, UserId};
use domain::{CartItem, CheckoutRequest, LineItemDraft, Order, OrderError};
use store::{Store, Transaction};

use crate::error::{Result, ServiceError};

/// Converts a user's cart into a `Pending` order.
///
/// Everything happens in one store transaction: resolving the user, locking
/// the cart and every book it references, decrementing stock, inserting the
/// order and deleting the consumed cart lines. Any failure drops the
/// transaction, so stock, orders and the cart are left exactly as they were.
#[derive(Clone)]
pub struct CheckoutEngine<S> {
    store: S,
}

impl<S: Store> CheckoutEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Checks out the full cart of `user_id`.
    #[tracing::instrument(skip_all, fields(user_id = %user_id))]
    pub async fn checkout(&self, user_id: UserId, request: &CheckoutRequest) -> Result<Order> {
        metrics::counter!("checkouts_total").increment(1);
        let started = Instant::now();

        let result = self.place_order(user_id, request).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                tracing::info!(
                    order_id = %order.id(),
                    lines = order.items().len(),
                    total = %order.total_price(),
                    "checkout succeeded"
                );
            }
            Err(e) => {
                metrics::counter!("checkouts_failed_total", "reason" => e.reason()).increment(1);
                if e.kind() == domain::ErrorKind::Internal {
                    tracing::error!(error = %e, "checkout failed");
                } else {
                    tracing::warn!(error = %e, reason = e.reason(), "checkout rejected");
                }
            }
        }
        result
    }

    async fn place_order(&self, user_id: UserId, request: &CheckoutRequest) -> Result<Order> {
        request.validate()?;

        let mut tx = self.store.begin().await?;

        if tx.find_user(user_id).await?.is_none() {
            return Err(ServiceError::UserNotFound(user_id));
        }

        let cart = tx.cart_items_for_update(user_id).await?;
        if cart.is_empty() {
            return Err(OrderError::EmptyCart.into());
        }

        // Books are locked in id order so two carts naming the same books in
        // different orders cannot deadlock each other.
        let mut book_ids: Vec<BookId> = cart.iter().map(CartItem::book_id).collect();
        book_ids.sort_unstable();
        book_ids.dedup();
        let mut books = HashMap::with_capacity(book_ids.len());
        for book_id in book_ids {
            if let Some(book) = tx.find_book_for_update(book_id).await? {
                books.insert(book_id, book);
            }
        }

        // Cart order decides which line fails first when stock runs short.
        let mut lines = Vec::with_capacity(cart.len());
        for item in &cart {
            let book = books.get_mut(&item.book_id()).ok_or(
                ServiceError::InvalidCartReference {
                    cart_item_id: item.id(),
                    book_id: item.book_id(),
                },
            )?;

            book.decrement_stock(item.quantity())?;
            tx.save_book(book).await?;
            tracing::debug!(
                book_id = %book.id(),
                quantity = item.quantity(),
                remaining = book.stock(),
                "stock decremented"
            );

            lines.push(LineItemDraft::for_book(book, item.quantity()));
        }

        let order = Order::place(user_id, request, lines, Utc::now())?;
        tx.insert_order(&order).await?;

        let consumed: Vec<_> = cart.iter().map(|item| item.id()).collect();
        tx.delete_cart_items(&consumed).await?;

        tx.commit().await?;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{BookId, Money};
    use domain::{Book, BookDetails, CartItem, Credential, Language, Profile, Role};
    use store::InMemoryStore;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            payment_method: Some("CREDIT_CARD".to_string()),
            recipient_name: "Ada Lovelace".to_string(),
            recipient_phone: "555-0100".to_string(),
            shipping_address: "12 Analytical Row".to_string(),
        }
    }

    fn create_test_book(title: &str, price_cents: i64, stock: u32) -> Book {
        Book::new(BookDetails {
            title: title.to_string(),
            author: "Author".to_string(),
            isbn: format!("isbn-{title}"),
            description: None,
            price: Money::from_cents(price_cents),
            stock,
            on_sale: true,
            language: Language::parse("en").unwrap(),
        })
        .unwrap()
    }

    async fn seed(store: &InMemoryStore, books: &[&Book], cart: &[(BookId, u32)]) -> UserId {
        let profile = Profile::new("Ada", Role::Member).unwrap();
        let credential = Credential::new(profile.id, "ada@example.com", "hash").unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_user(&profile, &credential).await.unwrap();
        for book in books {
            tx.insert_book(book).await.unwrap();
        }
        for (book_id, quantity) in cart {
            tx.save_cart_item(&CartItem::new(profile.id, *book_id, *quantity).unwrap())
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();
        profile.id
    }

    #[tokio::test]
    async fn checkout_prices_decrements_and_clears_cart() {
        let store = InMemoryStore::new();
        let book = create_test_book("Book X", 10_000, 10);
        let user = seed(&store, &[&book], &[(book.id(), 2)]).await;
        let engine = CheckoutEngine::new(store.clone());

        let order = engine.checkout(user, &request()).await.unwrap();

        assert_eq!(order.total_price(), Money::from_cents(20_000));
        assert_eq!(order.total_price().to_string(), "200.00");
        assert_eq!(order.status(), domain::OrderStatus::Pending);
        assert_eq!(store.find_book(book.id()).await.unwrap().unwrap().stock(), 8);
        assert!(store.cart_items(user).await.unwrap().is_empty());
        assert_eq!(store.book_write_count(book.id()).await, 1);
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let store = InMemoryStore::new();
        let engine = CheckoutEngine::new(store);

        let result = engine.checkout(UserId::new(), &request()).await;
        assert!(matches!(result, Err(ServiceError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn empty_cart_is_rejected() {
        let store = InMemoryStore::new();
        let user = seed(&store, &[], &[]).await;
        let engine = CheckoutEngine::new(store.clone());

        let err = engine.checkout(user, &request()).await.unwrap_err();
        assert_eq!(err.reason(), "empty_cart");
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn blank_recipient_is_rejected_before_touching_stock() {
        let store = InMemoryStore::new();
        let book = create_test_book("Book X", 1000, 10);
        let user = seed(&store, &[&book], &[(book.id(), 1)]).await;
        let engine = CheckoutEngine::new(store.clone());

        let mut bad = request();
        bad.shipping_address = "  ".to_string();
        let result = engine.checkout(user, &bad).await;

        assert!(matches!(
            result,
            Err(ServiceError::Domain(domain::DomainError::Order(
                OrderError::MissingField { .. }
            )))
        ));
        assert_eq!(store.book_write_count(book.id()).await, 0);
    }

    #[tokio::test]
    async fn off_sale_book_is_reported_as_out_of_stock() {
        let store = InMemoryStore::new();
        let mut book = create_test_book("Withdrawn", 1000, 10);
        book.set_on_sale(false);
        let user = seed(&store, &[&book], &[(book.id(), 1)]).await;
        let engine = CheckoutEngine::new(store.clone());

        let err = engine.checkout(user, &request()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Withdrawn is out of stock or no longer on sale (stock: 10)"
        );
        assert_eq!(store.cart_items(user).await.unwrap().len(), 1);
    }
}
