//! Cart lines.

use chrono::{DateTime, Utc};
use common::{BookId, CartItemId, UserId};
use serde::Serialize;

use crate::catalog::CatalogError;

/// One (book, quantity) intent in a user's cart.
///
/// A user holds at most one line per book; re-adding a book replaces the
/// quantity of the existing line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    id: CartItemId,
    user_id: UserId,
    book_id: BookId,
    quantity: u32,
    added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn new(user_id: UserId, book_id: BookId, quantity: u32) -> Result<Self, CatalogError> {
        validate_quantity(quantity)?;
        Ok(Self {
            id: CartItemId::new(),
            user_id,
            book_id,
            quantity,
            added_at: Utc::now(),
        })
    }

    /// Rebuilds a cart line from stored state.
    pub fn from_parts(
        id: CartItemId,
        user_id: UserId,
        book_id: BookId,
        quantity: u32,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            book_id,
            quantity,
            added_at,
        }
    }

    pub fn id(&self) -> CartItemId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), CatalogError> {
        validate_quantity(quantity)?;
        self.quantity = quantity;
        Ok(())
    }
}

fn validate_quantity(quantity: u32) -> Result<(), CatalogError> {
    if quantity == 0 {
        return Err(CatalogError::InvalidQuantity { quantity });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_quantity_is_rejected() {
        let result = CartItem::new(UserId::new(), BookId::new(), 0);
        assert!(matches!(
            result,
            Err(CatalogError::InvalidQuantity { quantity: 0 })
        ));
    }

    #[test]
    fn set_quantity_keeps_identity() {
        let mut item = CartItem::new(UserId::new(), BookId::new(), 2).unwrap();
        let id = item.id();
        item.set_quantity(5).unwrap();
        assert_eq!(item.quantity(), 5);
        assert_eq!(item.id(), id);
        assert!(item.set_quantity(0).is_err());
        assert_eq!(item.quantity(), 5);
    }
}
