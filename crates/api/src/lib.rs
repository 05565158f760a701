//! HTTP API server with observability for the bookstore backend.
//!
//! Provides REST endpoints for the catalog, reviews, carts, checkout, order
//! administration and account administration, with structured logging
//! (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use orders::{AccountService, CartService, CatalogService, OrderService, ReviewService};
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub orders: OrderService<S>,
    pub catalog: CatalogService<S>,
    pub cart: CartService<S>,
    pub accounts: AccountService<S>,
    pub reviews: ReviewService<S>,
}

impl<S: Store + Clone> AppState<S> {
    /// Wires every service to the same store.
    pub fn new(store: S) -> Self {
        Self {
            orders: OrderService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            cart: CartService::new(store.clone()),
            accounts: AccountService::new(store.clone()),
            reviews: ReviewService::new(store),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/users", post(routes::users::register::<S>))
        .route(
            "/users/me",
            get(routes::users::me).put(routes::users::update_me::<S>),
        )
        .route("/books", get(routes::books::browse::<S>))
        .route("/books/{id}", get(routes::books::get::<S>))
        .route(
            "/books/{id}/reviews",
            get(routes::reviews::list::<S>).post(routes::reviews::add::<S>),
        )
        .route("/cart", get(routes::cart::view::<S>))
        .route("/cart/items", put(routes::cart::put_item::<S>))
        .route("/cart/items/{id}", delete(routes::cart::remove_item::<S>))
        .route("/checkout", post(routes::orders::checkout::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route(
            "/admin/books",
            post(routes::books::create::<S>).get(routes::books::list_all::<S>),
        )
        .route(
            "/admin/books/{id}",
            get(routes::books::admin_get::<S>).put(routes::books::revise::<S>),
        )
        .route(
            "/admin/books/{id}/on-sale",
            put(routes::books::set_on_sale::<S>),
        )
        .route("/admin/orders", get(routes::orders::admin_list::<S>))
        .route("/admin/orders/{id}", get(routes::orders::admin_get::<S>))
        .route(
            "/admin/orders/{id}/status",
            put(routes::orders::update_status::<S>),
        )
        .route(
            "/admin/orders/{id}/status/override",
            put(routes::orders::force_update_status::<S>),
        )
        .route("/admin/users", get(routes::users::admin_list::<S>))
        .route("/admin/users/{id}/role", put(routes::users::set_role::<S>))
        .route(
            "/admin/users/{id}/active",
            put(routes::users::set_active::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
