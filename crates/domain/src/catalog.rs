//! Inventory records.

use common::{BookId, Money};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;
use crate::order::OrderError;

/// Errors raised while validating catalog and cart input.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Book title must not be empty")]
    EmptyTitle,

    #[error("Invalid price: {price} (must be between 0.00 and {max})", max = MAX_PRICE)]
    InvalidPrice { price: Money },

    #[error("Invalid language tag: {value:?}")]
    InvalidLanguage { value: String },

    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    #[error("Not enough stock for {title}: requested {requested}, available {stock}")]
    ExceedsStock {
        title: String,
        stock: u32,
        requested: u32,
    },

    #[error("Invalid rating: {rating} (must be between 1 and 5)")]
    InvalidRating { rating: u8 },

    #[error("Stock for book {book_id} would overflow")]
    StockOverflow { book_id: BookId },
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::ExceedsStock { .. } | CatalogError::StockOverflow { .. } => {
                ErrorKind::Conflict
            }
            _ => ErrorKind::Validation,
        }
    }
}

/// Language tag of a catalog entry, normalized to upper case (`"EN"`, `"ZH"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        let tag = raw.trim();
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(CatalogError::InvalidLanguage {
                value: raw.to_string(),
            });
        }
        Ok(Self(tag.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Language {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Language::parse(&value)
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.0
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Highest accepted unit price (1,000,000.00).
pub const MAX_PRICE: Money = Money::from_cents(100_000_000);

/// Editable attributes of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDetails {
    pub title: String,
    pub author: String,
    pub isbn: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    pub stock: u32,
    pub on_sale: bool,
    pub language: Language,
}

impl BookDetails {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.title.trim().is_empty() {
            return Err(CatalogError::EmptyTitle);
        }
        if self.price.is_negative() || self.price > MAX_PRICE {
            return Err(CatalogError::InvalidPrice { price: self.price });
        }
        Ok(())
    }
}

/// A catalog entry together with its inventory (price and stock).
///
/// Stock changes only through [`Book::decrement_stock`] (checkout),
/// [`Book::restore_stock`] (cancellation) and [`Book::revise`] (catalog
/// administration).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    id: BookId,
    #[serde(flatten)]
    details: BookDetails,
}

impl Book {
    /// Creates a new catalog entry after validating its details.
    pub fn new(details: BookDetails) -> Result<Self, CatalogError> {
        details.validate()?;
        Ok(Self {
            id: BookId::new(),
            details,
        })
    }

    /// Rebuilds a book from stored state.
    pub fn from_parts(id: BookId, details: BookDetails) -> Self {
        Self { id, details }
    }

    pub fn id(&self) -> BookId {
        self.id
    }

    pub fn details(&self) -> &BookDetails {
        &self.details
    }

    pub fn title(&self) -> &str {
        &self.details.title
    }

    pub fn price(&self) -> Money {
        self.details.price
    }

    pub fn stock(&self) -> u32 {
        self.details.stock
    }

    pub fn is_on_sale(&self) -> bool {
        self.details.on_sale
    }

    /// Returns true if the book is on sale and `quantity` fits the current stock.
    pub fn can_supply(&self, quantity: u32) -> bool {
        self.details.on_sale && quantity <= self.details.stock
    }

    /// Takes `quantity` copies out of stock for a checkout.
    pub fn decrement_stock(&mut self, quantity: u32) -> Result<(), OrderError> {
        if !self.can_supply(quantity) {
            return Err(OrderError::InsufficientStock {
                book_id: self.id,
                title: self.details.title.clone(),
                stock: self.details.stock,
                requested: quantity,
            });
        }
        self.details.stock -= quantity;
        Ok(())
    }

    /// Puts `quantity` copies back into stock after a cancellation.
    pub fn restore_stock(&mut self, quantity: u32) -> Result<(), CatalogError> {
        self.details.stock = self
            .details
            .stock
            .checked_add(quantity)
            .ok_or(CatalogError::StockOverflow { book_id: self.id })?;
        Ok(())
    }

    /// Replaces all editable attributes.
    pub fn revise(&mut self, details: BookDetails) -> Result<(), CatalogError> {
        details.validate()?;
        self.details = details;
        Ok(())
    }

    pub fn set_on_sale(&mut self, on_sale: bool) {
        self.details.on_sale = on_sale;
    }

    /// Case-insensitive match of `keyword` against title or author.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        self.details.title.to_lowercase().contains(&keyword)
            || self.details.author.to_lowercase().contains(&keyword)
    }
}
