//! Cart view priced at current catalog prices.

use common::{BookId, CartItemId, Money};
use domain::{Book, CartItem, OrderError};
use serde::Serialize;

/// A cart line joined with its book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    pub cart_item_id: CartItemId,
    pub book_id: BookId,
    pub title: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    /// Whether checkout would currently accept this line.
    pub available: bool,
}

/// A user's cart. Lines keep cart iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total_price_cents: i64,
}

impl CartView {
    /// Joins cart lines with their books. Lines whose book no longer exists are skipped.
    pub fn build<'a, F>(items: &[CartItem], mut lookup: F) -> Result<Self, OrderError>
    where
        F: FnMut(BookId) -> Option<&'a Book>,
    {
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let Some(book) = lookup(item.book_id()) else {
                continue;
            };
            let subtotal = book
                .price()
                .checked_multiply(item.quantity())
                .ok_or(OrderError::AmountOverflow)?;
            lines.push(CartLineView {
                cart_item_id: item.id(),
                book_id: book.id(),
                title: book.title().to_string(),
                quantity: item.quantity(),
                unit_price_cents: book.price().cents(),
                subtotal_cents: subtotal.cents(),
                available: book.can_supply(item.quantity()),
            });
        }

        let total = Money::checked_sum(
            lines
                .iter()
                .map(|line| Money::from_cents(line.subtotal_cents)),
        )
        .ok_or(OrderError::AmountOverflow)?;

        Ok(Self {
            items: lines,
            total_price_cents: total.cents(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
