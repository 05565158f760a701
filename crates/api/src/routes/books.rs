//! Catalog browsing and administration.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::BookId;
use domain::{Book, BookDetails};
use serde::Deserialize;
use store::Store;

use super::parse_id;
use crate::AppState;
use crate::auth::Admin;
use crate::error::ApiError;
use crate::extract::ApiJson;

#[derive(Debug, Default, Deserialize)]
pub struct BrowseParams {
    pub lang: Option<String>,
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct OnSaleRequest {
    pub on_sale: bool,
}

/// GET /books: on-sale books, optionally by language (`lang`) and keyword (`q`).
#[tracing::instrument(skip(state))]
pub async fn browse<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<BrowseParams>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let books = state
        .catalog
        .browse(params.lang.as_deref(), params.q.as_deref())
        .await?;
    Ok(Json(books))
}

/// GET /books/:id: one on-sale book.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Book>, ApiError> {
    let book_id: BookId = parse_id(&id)?;
    Ok(Json(state.catalog.get_book(book_id).await?))
}

/// GET /admin/books/:id: any book, on sale or not.
#[tracing::instrument(skip_all, fields(book_id = %id))]
pub async fn admin_get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Admin(_): Admin,
    Path(id): Path<String>,
) -> Result<Json<Book>, ApiError> {
    let book_id: BookId = parse_id(&id)?;
    Ok(Json(state.catalog.get_book_admin(book_id).await?))
}

/// GET /admin/books: the whole catalog.
#[tracing::instrument(skip_all)]
pub async fn list_all<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Admin(_): Admin,
) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.catalog.list_all().await?))
}

/// POST /admin/books: add a book.
#[tracing::instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Admin(admin): Admin,
    ApiJson(details): ApiJson<BookDetails>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = state.catalog.create_book(details).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// PUT /admin/books/:id: replace a book's details, stock included.
#[tracing::instrument(skip_all, fields(admin_id = %admin.id, book_id = %id))]
pub async fn revise<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Admin(admin): Admin,
    Path(id): Path<String>,
    ApiJson(details): ApiJson<BookDetails>,
) -> Result<Json<Book>, ApiError> {
    let book_id: BookId = parse_id(&id)?;
    Ok(Json(state.catalog.revise_book(book_id, details).await?))
}

/// PUT /admin/books/:id/on-sale: put a book on or off sale.
#[tracing::instrument(skip_all, fields(admin_id = %admin.id, book_id = %id))]
pub async fn set_on_sale<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Admin(admin): Admin,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<OnSaleRequest>,
) -> Result<Json<Book>, ApiError> {
    let book_id: BookId = parse_id(&id)?;
    Ok(Json(state.catalog.set_on_sale(book_id, req.on_sale).await?))
}
