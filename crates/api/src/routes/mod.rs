//! HTTP handlers, one module per resource.

pub mod books;
pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod reviews;
pub mod users;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a path identifier, answering 400 on malformed input.
fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
