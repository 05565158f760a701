//! Catalog administration and browsing.

use common::BookId;
use domain::{Book, BookDetails, Language};
use store::{BookQuery, Store, Transaction};

use crate::error::{Result, ServiceError};

/// Manages the books checkout sells.
#[derive(Clone)]
pub struct CatalogService<S> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds a book. The ISBN must not be in use.
    #[tracing::instrument(skip_all, fields(isbn = %details.isbn))]
    pub async fn create_book(&self, details: BookDetails) -> Result<Book> {
        let book = Book::new(details)?;

        let mut tx = self.store.begin().await?;
        tx.insert_book(&book).await?;
        tx.commit().await?;

        tracing::info!(book_id = %book.id(), title = book.title(), "book created");
        Ok(book)
    }

    /// Replaces every editable attribute of a book, stock included.
    #[tracing::instrument(skip(self, details))]
    pub async fn revise_book(&self, id: BookId, details: BookDetails) -> Result<Book> {
        let mut tx = self.store.begin().await?;
        let mut book = tx
            .find_book_for_update(id)
            .await?
            .ok_or(ServiceError::BookNotFound(id))?;
        book.revise(details)?;
        tx.save_book(&book).await?;
        tx.commit().await?;

        tracing::info!(stock = book.stock(), "book revised");
        Ok(book)
    }

    /// Puts a book on or off sale.
    #[tracing::instrument(skip(self))]
    pub async fn set_on_sale(&self, id: BookId, on_sale: bool) -> Result<Book> {
        let mut tx = self.store.begin().await?;
        let mut book = tx
            .find_book_for_update(id)
            .await?
            .ok_or(ServiceError::BookNotFound(id))?;
        book.set_on_sale(on_sale);
        tx.save_book(&book).await?;
        tx.commit().await?;
        Ok(book)
    }

    /// Fetches a book customers can buy. Off-sale books read as missing.
    pub async fn get_book(&self, id: BookId) -> Result<Book> {
        self.store
            .find_book(id)
            .await?
            .filter(Book::is_on_sale)
            .ok_or(ServiceError::BookNotFound(id))
    }

    /// Fetches any book regardless of its sale flag.
    pub async fn get_book_admin(&self, id: BookId) -> Result<Book> {
        self.store
            .find_book(id)
            .await?
            .ok_or(ServiceError::BookNotFound(id))
    }

    /// Lists on-sale books, optionally filtered by language tag and keyword.
    pub async fn browse(&self, language: Option<&str>, keyword: Option<&str>) -> Result<Vec<Book>> {
        let mut query = BookQuery::on_sale();
        if let Some(language) = language {
            query = query.in_language(Language::parse(language)?);
        }
        if let Some(keyword) = keyword {
            query = query.with_keyword(keyword);
        }
        Ok(self.store.list_books(query).await?)
    }

    /// Lists the whole catalog, on sale or not.
    pub async fn list_all(&self) -> Result<Vec<Book>> {
        Ok(self.store.list_books(BookQuery::all()).await?)
    }
}
