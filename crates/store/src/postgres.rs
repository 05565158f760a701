use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookId, CartItemId, LineItemId, Money, OrderId, ReviewId, UserId};
use domain::{
    Account, Book, BookDetails, CartItem, Credential, Language, Order, OrderLineItem, OrderParts,
    OrderStatus, Profile, Review, Role,
};
use sqlx::{PgConnection, PgPool, Postgres, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    BookQuery, OrderQuery, Result, StoreError,
    store::{Store, Transaction},
};

const BOOK_COLUMNS: &str =
    "id, title, author, isbn, description, price_cents, stock, on_sale, language";
const CART_COLUMNS: &str = "id, user_id, book_id, quantity, added_at";
const ACCOUNT_SELECT: &str = "SELECT u.id, u.display_name, u.role, \
     c.email, c.password_hash, c.active \
     FROM users u JOIN credentials c ON c.user_id = u.id";
const REVIEW_COLUMNS: &str = "id, book_id, user_id, rating, content, created_at";
const ORDER_COLUMNS: &str = "id, user_id, total_price_cents, status, payment_method, \
     recipient_name, recipient_phone, shipping_address, created_at";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        tracing::debug!(max_connections, "connected to Postgres");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }
}

fn corrupt(entity: &'static str, id: Uuid, reason: impl ToString) -> StoreError {
    StoreError::Corrupt {
        entity,
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

fn to_u32(value: i64, entity: &'static str, id: Uuid) -> Result<u32> {
    u32::try_from(value).map_err(|_| corrupt(entity, id, format!("{value} is out of range")))
}

/// Maps unique violations to `Duplicate`; everything else goes through `From`.
fn map_unique(
    entity: &'static str,
    key: impl FnOnce() -> String,
) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return StoreError::Duplicate { entity, key: key() };
        }
        StoreError::from(e)
    }
}

fn row_to_profile(row: PgRow) -> Result<Profile> {
    let id: Uuid = row.try_get("id")?;
    let role: String = row.try_get("role")?;
    Ok(Profile {
        id: UserId::from_uuid(id),
        display_name: row.try_get("display_name")?,
        role: Role::parse(&role).map_err(|e| corrupt("user", id, e))?,
    })
}

fn row_to_account(row: PgRow) -> Result<Account> {
    let id: Uuid = row.try_get("id")?;
    let credential = Credential {
        user_id: UserId::from_uuid(id),
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        active: row.try_get("active")?,
    };
    Ok(Account {
        profile: row_to_profile(row)?,
        credential,
    })
}

fn row_to_review(row: PgRow) -> Result<Review> {
    let id: Uuid = row.try_get("id")?;
    let rating: i16 = row.try_get("rating")?;
    let rating = u8::try_from(rating)
        .map_err(|_| corrupt("review", id, format!("rating {rating} is out of range")))?;
    Ok(Review::from_parts(
        ReviewId::from_uuid(id),
        BookId::from_uuid(row.try_get("book_id")?),
        UserId::from_uuid(row.try_get("user_id")?),
        rating,
        row.try_get("content")?,
        row.try_get::<DateTime<Utc>, _>("created_at")?,
    ))
}

fn row_to_book(row: PgRow) -> Result<Book> {
    let id: Uuid = row.try_get("id")?;
    let language: String = row.try_get("language")?;
    let details = BookDetails {
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        isbn: row.try_get("isbn")?,
        description: row.try_get("description")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: to_u32(row.try_get("stock")?, "book", id)?,
        on_sale: row.try_get("on_sale")?,
        language: Language::parse(&language).map_err(|e| corrupt("book", id, e))?,
    };
    Ok(Book::from_parts(BookId::from_uuid(id), details))
}

fn row_to_cart_item(row: PgRow) -> Result<CartItem> {
    let id: Uuid = row.try_get("id")?;
    Ok(CartItem::from_parts(
        CartItemId::from_uuid(id),
        UserId::from_uuid(row.try_get("user_id")?),
        BookId::from_uuid(row.try_get("book_id")?),
        to_u32(row.try_get("quantity")?, "cart item", id)?,
        row.try_get::<DateTime<Utc>, _>("added_at")?,
    ))
}

fn row_to_line_item(row: &PgRow) -> Result<OrderLineItem> {
    let id: Uuid = row.try_get("id")?;
    Ok(OrderLineItem::from_parts(
        LineItemId::from_uuid(id),
        OrderId::from_uuid(row.try_get("order_id")?),
        BookId::from_uuid(row.try_get("book_id")?),
        row.try_get("book_title")?,
        to_u32(row.try_get("quantity")?, "line item", id)?,
        Money::from_cents(row.try_get("unit_price_cents")?),
        Money::from_cents(row.try_get("subtotal_cents")?),
    ))
}

fn row_to_order(row: PgRow, items: Vec<OrderLineItem>) -> Result<Order> {
    let id: Uuid = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    Ok(Order::from_parts(OrderParts {
        id: OrderId::from_uuid(id),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        items,
        total_price: Money::from_cents(row.try_get("total_price_cents")?),
        status: OrderStatus::parse(&status).map_err(|e| corrupt("order", id, e))?,
        payment_method: row.try_get("payment_method")?,
        recipient_name: row.try_get("recipient_name")?,
        recipient_phone: row.try_get("recipient_phone")?,
        shipping_address: row.try_get("shipping_address")?,
        created_at: row.try_get("created_at")?,
    }))
}

/// Loads the line items of several orders, grouped by order and kept in checkout order.
async fn fetch_line_items<'e, E>(
    executor: E,
    order_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<OrderLineItem>>>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows = sqlx::query(
        r#"
        SELECT id, order_id, book_id, book_title, quantity, unit_price_cents, subtotal_cents
        FROM order_line_items
        WHERE order_id = ANY($1)
        ORDER BY order_id, position ASC
        "#,
    )
    .bind(order_ids)
    .fetch_all(executor)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<OrderLineItem>> = HashMap::new();
    for row in &rows {
        let order_id: Uuid = row.try_get("order_id")?;
        grouped
            .entry(order_id)
            .or_default()
            .push(row_to_line_item(row)?);
    }
    Ok(grouped)
}

async fn fetch_order(conn: &mut PgConnection, id: OrderId, lock: bool) -> Result<Option<Order>> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1{}",
        if lock { " FOR UPDATE" } else { "" }
    );
    let Some(row) = sqlx::query(&sql)
        .bind(id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let mut items = fetch_line_items(&mut *conn, &[id.as_uuid()]).await?;
    let items = items.remove(&id.as_uuid()).unwrap_or_default();
    row_to_order(row, items).map(Some)
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await?;
        Ok(PgTransaction { tx })
    }

    async fn find_user(&self, id: UserId) -> Result<Option<Profile>> {
        sqlx::query("SELECT id, display_name, role FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_profile)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<Profile>> {
        sqlx::query(
            r#"
            SELECT u.id, u.display_name, u.role
            FROM users u
            JOIN credentials c ON c.user_id = u.id
            WHERE c.email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(row_to_profile)
        .transpose()
    }

    async fn find_account(&self, id: UserId) -> Result<Option<Account>> {
        sqlx::query(&format!("{ACCOUNT_SELECT} WHERE u.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_account)
            .transpose()
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!("{ACCOUNT_SELECT} ORDER BY c.email ASC"))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_account).collect()
    }

    async fn find_book(&self, id: BookId) -> Result<Option<Book>> {
        sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_book)
            .transpose()
    }

    async fn list_books(&self, query: BookQuery) -> Result<Vec<Book>> {
        let mut sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE 1=1");
        let mut param_count = 0;

        if query.on_sale_only {
            sql.push_str(" AND on_sale");
        }
        if query.language.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND language = ${param_count}"));
        }
        if query.keyword.is_some() {
            param_count += 1;
            sql.push_str(&format!(
                " AND (title ILIKE ${param_count} OR author ILIKE ${param_count})"
            ));
        }
        sql.push_str(" ORDER BY title ASC, id ASC");

        let mut q = sqlx::query(&sql);
        if let Some(ref language) = query.language {
            q = q.bind(language.as_str());
        }
        if let Some(ref keyword) = query.keyword {
            let escaped = keyword
                .trim()
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            q = q.bind(format!("%{escaped}%"));
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_book).collect()
    }

    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 ORDER BY added_at ASC, id ASC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_cart_item).collect()
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut *conn, id, false).await
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = 0;

        if query.user_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND user_id = ${param_count}"));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut q = sqlx::query(&sql);
        if let Some(user_id) = query.user_id {
            q = q.bind(user_id.as_uuid());
        }

        let rows = q.fetch_all(&self.pool).await?;
        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut items = fetch_line_items(&self.pool, &ids).await?;

        rows.into_iter()
            .zip(ids)
            .map(|(row, id)| row_to_order(row, items.remove(&id).unwrap_or_default()))
            .collect()
    }

    async fn reviews_for_book(&self, book_id: BookId) -> Result<Vec<Review>> {
        let rows = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE book_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(book_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_review).collect()
    }
}

/// A READ COMMITTED transaction that locks the rows it reads for update.
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn find_user(&mut self, id: UserId) -> Result<Option<Profile>> {
        sqlx::query("SELECT id, display_name, role FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(row_to_profile)
            .transpose()
    }

    async fn insert_user(&mut self, profile: &Profile, credential: &Credential) -> Result<()> {
        sqlx::query("INSERT INTO users (id, display_name, role) VALUES ($1, $2, $3)")
            .bind(profile.id.as_uuid())
            .bind(&profile.display_name)
            .bind(profile.role.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(map_unique("user", || profile.id.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO credentials (user_id, email, password_hash, active)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(credential.user_id.as_uuid())
        .bind(&credential.email)
        .bind(&credential.password_hash)
        .bind(credential.active)
        .execute(&mut *self.tx)
        .await
        .map_err(map_unique("credential", || credential.email.clone()))?;

        Ok(())
    }

    async fn find_account_for_update(&mut self, id: UserId) -> Result<Option<Account>> {
        sqlx::query(&format!("{ACCOUNT_SELECT} WHERE u.id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(row_to_account)
            .transpose()
    }

    async fn save_account(&mut self, account: &Account) -> Result<()> {
        let profile = sqlx::query("UPDATE users SET display_name = $2, role = $3 WHERE id = $1")
            .bind(account.id().as_uuid())
            .bind(&account.profile.display_name)
            .bind(account.profile.role.as_str())
            .execute(&mut *self.tx)
            .await?;
        let credential = sqlx::query("UPDATE credentials SET active = $2 WHERE user_id = $1")
            .bind(account.id().as_uuid())
            .bind(account.credential.active)
            .execute(&mut *self.tx)
            .await?;

        if profile.rows_affected() == 0 || credential.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "account {} vanished",
                account.id()
            )));
        }
        Ok(())
    }

    async fn find_book_for_update(&mut self, id: BookId) -> Result<Option<Book>> {
        sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?
        .map(row_to_book)
        .transpose()
    }

    async fn insert_book(&mut self, book: &Book) -> Result<()> {
        let details = book.details();
        sqlx::query(&format!(
            "INSERT INTO books ({BOOK_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(book.id().as_uuid())
        .bind(&details.title)
        .bind(&details.author)
        .bind(&details.isbn)
        .bind(&details.description)
        .bind(details.price.cents())
        .bind(i64::from(details.stock))
        .bind(details.on_sale)
        .bind(details.language.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(map_unique("book", || details.isbn.clone()))?;
        Ok(())
    }

    async fn save_book(&mut self, book: &Book) -> Result<()> {
        let details = book.details();
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $2, author = $3, isbn = $4, description = $5,
                price_cents = $6, stock = $7, on_sale = $8, language = $9
            WHERE id = $1
            "#,
        )
        .bind(book.id().as_uuid())
        .bind(&details.title)
        .bind(&details.author)
        .bind(&details.isbn)
        .bind(&details.description)
        .bind(details.price.cents())
        .bind(i64::from(details.stock))
        .bind(details.on_sale)
        .bind(details.language.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(map_unique("book", || details.isbn.clone()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("book {} vanished", book.id())));
        }
        Ok(())
    }

    async fn cart_items_for_update(&mut self, user_id: UserId) -> Result<Vec<CartItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 \
             ORDER BY added_at ASC, id ASC FOR UPDATE"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_cart_item).collect()
    }

    async fn save_cart_item(&mut self, item: &CartItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (id, user_id, book_id, quantity, added_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET quantity = EXCLUDED.quantity
            "#,
        )
        .bind(item.id().as_uuid())
        .bind(item.user_id().as_uuid())
        .bind(item.book_id().as_uuid())
        .bind(i64::from(item.quantity()))
        .bind(item.added_at())
        .execute(&mut *self.tx)
        .await
        .map_err(map_unique("cart item", || {
            format!("{}/{}", item.user_id(), item.book_id())
        }))?;
        Ok(())
    }

    async fn delete_cart_items(&mut self, ids: &[CartItemId]) -> Result<()> {
        let uuids: Vec<Uuid> = ids.iter().map(CartItemId::as_uuid).collect();
        let result = sqlx::query("DELETE FROM cart_items WHERE id = ANY($1)")
            .bind(&uuids)
            .execute(&mut *self.tx)
            .await?;

        let deleted = result.rows_affected();
        if deleted != ids.len() as u64 {
            tracing::warn!(expected = ids.len(), deleted, "cart lines changed under the transaction");
            return Err(StoreError::Conflict(format!(
                "expected to delete {} cart items, deleted {deleted}",
                ids.len()
            )));
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(order.id().as_uuid())
        .bind(order.user_id().as_uuid())
        .bind(order.total_price().cents())
        .bind(order.status().as_str())
        .bind(order.payment_method())
        .bind(order.recipient_name())
        .bind(order.recipient_phone())
        .bind(order.shipping_address())
        .bind(order.created_at())
        .execute(&mut *self.tx)
        .await
        .map_err(map_unique("order", || order.id().to_string()))?;

        for (position, item) in (0_i32..).zip(order.items()) {
            sqlx::query(
                r#"
                INSERT INTO order_line_items
                    (id, order_id, position, book_id, book_title, quantity, unit_price_cents, subtotal_cents)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id().as_uuid())
            .bind(order.id().as_uuid())
            .bind(position)
            .bind(item.book_id().as_uuid())
            .bind(item.book_title())
            .bind(i64::from(item.quantity()))
            .bind(item.unit_price().cents())
            .bind(item.subtotal().cents())
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn find_order_for_update(&mut self, id: OrderId) -> Result<Option<Order>> {
        fetch_order(&mut *self.tx, id, true).await
    }

    async fn save_order_status(&mut self, order: &Order) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(order.id().as_uuid())
            .bind(order.status().as_str())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("order {} vanished", order.id())));
        }
        Ok(())
    }

    async fn insert_review(&mut self, review: &Review) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO reviews ({REVIEW_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
        ))
        .bind(review.id().as_uuid())
        .bind(review.book_id().as_uuid())
        .bind(review.user_id().as_uuid())
        .bind(i16::from(review.rating()))
        .bind(review.content())
        .bind(review.created_at())
        .execute(&mut *self.tx)
        .await
        .map_err(map_unique("review", || review.id().to_string()))?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
