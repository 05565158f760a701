//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency and clear
//! its tables before each test, so they run one at a time (`#[serial]`).

use std::sync::Arc;

use chrono::{Duration, SubsecRound, Utc};
use common::{CartItemId, Money, UserId};
use domain::{
    Book, BookDetails, CancellationPolicy, CartItem, CheckoutRequest, Credential, Language,
    LineItemDraft, Order, OrderStatus, Profile, Review, Role,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{BookQuery, OrderQuery, PostgresStore, Store, StoreError, Transaction};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            for migration in [
                include_str!("../../../migrations/001_create_bookstore_tables.sql"),
                include_str!("../../../migrations/002_create_reviews.sql"),
            ] {
                sqlx::raw_sql(migration).execute(&temp_pool).await.unwrap();
            }
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;
    let store = PostgresStore::connect(&info.connection_string, 5)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE reviews, order_line_items, orders, cart_items, books, credentials, users CASCADE",
    )
    .execute(store.pool())
    .await
    .unwrap();

    store
}

fn create_test_book(title: &str, isbn: &str, price_cents: i64, stock: u32) -> Book {
    Book::new(BookDetails {
        title: title.to_string(),
        author: "Frank Herbert".to_string(),
        isbn: isbn.to_string(),
        description: Some("Spice".to_string()),
        price: Money::from_cents(price_cents),
        stock,
        on_sale: true,
        language: Language::parse("en").unwrap(),
    })
    .unwrap()
}

async fn seed_user(store: &PostgresStore, email: &str) -> Profile {
    let profile = Profile::new("Reader", Role::Member).unwrap();
    let credential = Credential::new(profile.id, email, "hash").unwrap();
    let mut tx = store.begin().await.unwrap();
    tx.insert_user(&profile, &credential).await.unwrap();
    tx.commit().await.unwrap();
    profile
}

async fn seed_book(store: &PostgresStore, book: &Book) {
    let mut tx = store.begin().await.unwrap();
    tx.insert_book(book).await.unwrap();
    tx.commit().await.unwrap();
}

fn request() -> CheckoutRequest {
    CheckoutRequest {
        payment_method: None,
        recipient_name: "Paul".to_string(),
        recipient_phone: "555-0101".to_string(),
        shipping_address: "Arrakeen".to_string(),
    }
}

#[tokio::test]
#[serial]
async fn user_roundtrip_and_duplicate_email() {
    let store = get_test_store().await;
    let profile = seed_user(&store, "reader@example.com").await;

    let found = store.find_user(profile.id).await.unwrap().unwrap();
    assert_eq!(found, profile);
    let by_email = store
        .find_user_by_email("reader@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_email.id, profile.id);

    let other = Profile::new("Other", Role::Member).unwrap();
    let mut tx = store.begin().await.unwrap();
    let result = tx
        .insert_user(
            &other,
            &Credential::new(other.id, "READER@example.com", "hash").unwrap(),
        )
        .await;
    assert!(matches!(result, Err(StoreError::Duplicate { .. })));
}

#[tokio::test]
#[serial]
async fn book_filters_and_duplicate_isbn() {
    let store = get_test_store().await;
    let dune = create_test_book("Dune", "isbn-1", 1000, 3);
    let mut messiah = create_test_book("Dune Messiah", "isbn-2", 900, 3);
    messiah.set_on_sale(false);
    seed_book(&store, &dune).await;
    seed_book(&store, &messiah).await;

    let on_sale = store.list_books(BookQuery::on_sale()).await.unwrap();
    assert_eq!(on_sale.len(), 1);
    assert_eq!(on_sale[0], dune);

    let all = store
        .list_books(BookQuery::all().with_keyword("MESSIAH"))
        .await
        .unwrap();
    assert_eq!(all.len(), 1);

    let mut tx = store.begin().await.unwrap();
    let result = tx
        .insert_book(&create_test_book("Copy", "isbn-1", 100, 1))
        .await;
    assert!(matches!(result, Err(StoreError::Duplicate { entity: "book", .. })));
}

#[tokio::test]
#[serial]
async fn rollback_discards_stock_change() {
    let store = get_test_store().await;
    let book = create_test_book("Dune", "isbn-1", 1000, 5);
    seed_book(&store, &book).await;

    {
        let mut tx = store.begin().await.unwrap();
        let mut locked = tx.find_book_for_update(book.id()).await.unwrap().unwrap();
        locked.decrement_stock(5).unwrap();
        tx.save_book(&locked).await.unwrap();
    }

    let found = store.find_book(book.id()).await.unwrap().unwrap();
    assert_eq!(found.stock(), 5);
}

#[tokio::test]
#[serial]
async fn order_roundtrip_keeps_line_order_and_status() {
    let store = get_test_store().await;
    let user = seed_user(&store, "buyer@example.com").await;
    let first = create_test_book("Dune", "isbn-1", 1000, 5);
    let second = create_test_book("Children of Dune", "isbn-2", 1250, 5);
    seed_book(&store, &first).await;
    seed_book(&store, &second).await;

    let mut order = Order::place(
        user.id,
        &request(),
        vec![
            LineItemDraft::for_book(&first, 2),
            LineItemDraft::for_book(&second, 1),
        ],
        Utc::now().trunc_subsecs(0),
    )
    .unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.commit().await.unwrap();

    let stored = store.find_order(order.id()).await.unwrap().unwrap();
    assert_eq!(stored, order);
    assert_eq!(stored.total_price(), Money::from_cents(3250));
    assert_eq!(stored.items()[0].book_id(), first.id());

    let mut tx = store.begin().await.unwrap();
    let mut locked = tx.find_order_for_update(order.id()).await.unwrap().unwrap();
    locked
        .transition(OrderStatus::Shipped, CancellationPolicy::Guarded)
        .unwrap();
    tx.save_order_status(&locked).await.unwrap();
    tx.commit().await.unwrap();

    order
        .transition(OrderStatus::Shipped, CancellationPolicy::Guarded)
        .unwrap();
    let mine = store
        .list_orders(OrderQuery::for_user(user.id))
        .await
        .unwrap();
    assert_eq!(mine, vec![order]);
    assert!(
        store
            .list_orders(OrderQuery::for_user(UserId::new()))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
#[serial]
async fn cart_lines_are_ordered_and_deleted_exactly() {
    let store = get_test_store().await;
    let user = seed_user(&store, "cart@example.com").await;
    let first = create_test_book("Dune", "isbn-1", 1000, 5);
    let second = create_test_book("Arrakis", "isbn-2", 1000, 5);
    seed_book(&store, &first).await;
    seed_book(&store, &second).await;

    let line_a = CartItem::new(user.id, first.id(), 1).unwrap();
    let line_b = CartItem::from_parts(
        CartItemId::new(),
        user.id,
        second.id(),
        2,
        line_a.added_at() + Duration::seconds(1),
    );
    let mut tx = store.begin().await.unwrap();
    tx.save_cart_item(&line_a).await.unwrap();
    tx.save_cart_item(&line_b).await.unwrap();
    let duplicate = tx
        .save_cart_item(&CartItem::new(user.id, first.id(), 4).unwrap())
        .await;
    assert!(matches!(duplicate, Err(StoreError::Duplicate { .. })));
    drop(tx);

    let mut tx = store.begin().await.unwrap();
    tx.save_cart_item(&line_a).await.unwrap();
    tx.save_cart_item(&line_b).await.unwrap();
    tx.commit().await.unwrap();

    let cart = store.cart_items(user.id).await.unwrap();
    assert_eq!(cart.len(), 2);
    assert_eq!(cart[0].id(), line_a.id());

    let mut tx = store.begin().await.unwrap();
    let result = tx
        .delete_cart_items(&[line_a.id(), CartItemId::new()])
        .await;
    assert!(matches!(result, Err(StoreError::Conflict(_))));
    drop(tx);

    assert_eq!(store.cart_items(user.id).await.unwrap().len(), 2);
}

#[tokio::test]
#[serial]
async fn row_lock_makes_the_second_writer_see_the_first() {
    let store = get_test_store().await;
    let book = create_test_book("Dune", "isbn-1", 1000, 5);
    seed_book(&store, &book).await;

    let mut first = store.begin().await.unwrap();
    let mut locked = first.find_book_for_update(book.id()).await.unwrap().unwrap();

    let contender = {
        let store = store.clone();
        let book_id = book.id();
        tokio::spawn(async move {
            let mut tx = store.begin().await.unwrap();
            let mut book = tx.find_book_for_update(book_id).await.unwrap().unwrap();
            let seen = book.stock();
            book.decrement_stock(2).unwrap();
            tx.save_book(&book).await.unwrap();
            tx.commit().await.unwrap();
            seen
        })
    };

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    locked.decrement_stock(3).unwrap();
    first.save_book(&locked).await.unwrap();
    first.commit().await.unwrap();

    assert_eq!(contender.await.unwrap(), 2);
    let found = store.find_book(book.id()).await.unwrap().unwrap();
    assert_eq!(found.stock(), 0);
}

#[tokio::test]
#[serial]
async fn deadlock_is_reported_as_conflict() {
    let store = get_test_store().await;
    let x = create_test_book("Dune", "isbn-1", 1000, 5);
    let y = create_test_book("Arrakis", "isbn-2", 1000, 5);
    seed_book(&store, &x).await;
    seed_book(&store, &y).await;

    let mut a = store.begin().await.unwrap();
    let mut b = store.begin().await.unwrap();
    a.find_book_for_update(x.id()).await.unwrap();
    b.find_book_for_update(y.id()).await.unwrap();

    // Each side now waits on the row the other holds. A failed side drops
    // its transaction, which releases its lock for the survivor.
    let (x_id, y_id) = (x.id(), y.id());
    let first = tokio::spawn(async move {
        a.find_book_for_update(y_id).await?;
        a.commit().await
    });
    let second = tokio::spawn(async move {
        b.find_book_for_update(x_id).await?;
        b.commit().await
    });
    let outcomes = [first.await.unwrap(), second.await.unwrap()];

    let conflicts = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(StoreError::Conflict(_))))
        .count();
    assert_eq!(conflicts, 1, "{outcomes:?}");
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
}

#[tokio::test]
#[serial]
async fn account_and_review_roundtrip() {
    let store = get_test_store().await;
    let reader = seed_user(&store, "reader@example.com").await;
    let book = create_test_book("Dune", "isbn-1", 1000, 5);
    seed_book(&store, &book).await;

    let mut tx = store.begin().await.unwrap();
    let mut account = tx.find_account_for_update(reader.id).await.unwrap().unwrap();
    assert!(account.is_active());
    account.profile.rename("Muad'Dib");
    account.credential.active = false;
    tx.save_account(&account).await.unwrap();

    let now = Utc::now().trunc_subsecs(0);
    let older = Review::new(book.id(), reader.id, 4, "Spice", now).unwrap();
    let newer = Review::new(book.id(), reader.id, 5, "Worms", now + Duration::seconds(1)).unwrap();
    tx.insert_review(&older).await.unwrap();
    tx.insert_review(&newer).await.unwrap();
    tx.commit().await.unwrap();

    let stored = store.find_account(reader.id).await.unwrap().unwrap();
    assert_eq!(stored, account);
    assert_eq!(stored.email(), "reader@example.com");
    assert_eq!(store.list_accounts().await.unwrap(), vec![stored]);

    let reviews = store.reviews_for_book(book.id()).await.unwrap();
    assert_eq!(reviews, vec![newer, older]);
}
