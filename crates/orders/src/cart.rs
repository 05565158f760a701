//! Shopping cart.

use std::collections::HashMap;

use common::{BookId, CartItemId, UserId};
use domain::{CartItem, CatalogError};
use projections::CartView;
use store::{Store, Transaction};

use crate::error::{Result, ServiceError};

/// Maintains each user's cart lines.
#[derive(Clone)]
pub struct CartService<S> {
    store: S,
}

impl<S: Store> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Puts `quantity` copies of a book in the cart, replacing any earlier quantity.
    ///
    /// The quantity must be positive and fit the book's current stock. Stock
    /// is checked again at checkout.
    #[tracing::instrument(skip(self))]
    pub async fn add_or_update(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: u32,
    ) -> Result<CartItem> {
        if quantity == 0 {
            return Err(CatalogError::InvalidQuantity { quantity }.into());
        }

        let book = self
            .store
            .find_book(book_id)
            .await?
            .ok_or(ServiceError::BookNotFound(book_id))?;
        if quantity > book.stock() {
            return Err(CatalogError::ExceedsStock {
                title: book.title().to_string(),
                stock: book.stock(),
                requested: quantity,
            }
            .into());
        }

        let mut tx = self.store.begin().await?;
        if tx.find_user(user_id).await?.is_none() {
            return Err(ServiceError::UserNotFound(user_id));
        }

        let existing = tx
            .cart_items_for_update(user_id)
            .await?
            .into_iter()
            .find(|item| item.book_id() == book_id);
        let item = match existing {
            Some(mut item) => {
                item.set_quantity(quantity)?;
                item
            }
            None => CartItem::new(user_id, book_id, quantity)?,
        };

        tx.save_cart_item(&item).await?;
        tx.commit().await?;
        Ok(item)
    }

    /// Removes one line from the owner's cart. Lines of other users read as missing.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, cart_item_id: CartItemId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let owned = tx
            .cart_items_for_update(user_id)
            .await?
            .iter()
            .any(|item| item.id() == cart_item_id);
        if !owned {
            return Err(ServiceError::CartItemNotFound(cart_item_id));
        }
        tx.delete_cart_items(&[cart_item_id]).await?;
        tx.commit().await?;
        Ok(())
    }

    /// The user's cart priced at current catalog prices.
    pub async fn view(&self, user_id: UserId) -> Result<CartView> {
        let items = self.store.cart_items(user_id).await?;
        let mut books = HashMap::with_capacity(items.len());
        for item in &items {
            if let Some(book) = self.store.find_book(item.book_id()).await? {
                books.insert(book.id(), book);
            }
        }
        Ok(CartView::build(&items, |id| books.get(&id))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use domain::{Book, BookDetails, Credential, ErrorKind, Language, Profile, Role};
    use store::InMemoryStore;

    async fn setup(stock: u32) -> (CartService<InMemoryStore>, UserId, Book) {
        let store = InMemoryStore::new();
        let profile = Profile::new("Reader", Role::Member).unwrap();
        let credential = Credential::new(profile.id, "reader@example.com", "hash").unwrap();
        let book = Book::new(BookDetails {
            title: "Neuromancer".to_string(),
            author: "William Gibson".to_string(),
            isbn: "isbn-neuro".to_string(),
            description: None,
            price: Money::from_cents(1299),
            stock,
            on_sale: true,
            language: Language::parse("en").unwrap(),
        })
        .unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_user(&profile, &credential).await.unwrap();
        tx.insert_book(&book).await.unwrap();
        tx.commit().await.unwrap();

        (CartService::new(store), profile.id, book)
    }

    #[tokio::test]
    async fn re_adding_replaces_quantity() {
        let (cart, user, book) = setup(5).await;

        let first = cart.add_or_update(user, book.id(), 1).await.unwrap();
        let second = cart.add_or_update(user, book.id(), 4).await.unwrap();

        assert_eq!(first.id(), second.id());
        let view = cart.view(user).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 4);
    }

    #[tokio::test]
    async fn quantity_must_be_positive_and_in_stock() {
        let (cart, user, book) = setup(2).await;

        let zero = cart.add_or_update(user, book.id(), 0).await.unwrap_err();
        assert_eq!(zero.kind(), ErrorKind::Validation);

        let too_many = cart.add_or_update(user, book.id(), 3).await.unwrap_err();
        assert_eq!(too_many.kind(), ErrorKind::Conflict);

        let missing = cart.add_or_update(user, BookId::new(), 1).await;
        assert!(matches!(missing, Err(ServiceError::BookNotFound(_))));
    }

    #[tokio::test]
    async fn unknown_user_cannot_add() {
        let (cart, _, book) = setup(2).await;
        let result = cart.add_or_update(UserId::new(), book.id(), 1).await;
        assert!(matches!(result, Err(ServiceError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn only_owner_can_remove() {
        let (cart, user, book) = setup(5).await;
        let item = cart.add_or_update(user, book.id(), 1).await.unwrap();

        let stranger = cart.remove_item(UserId::new(), item.id()).await;
        assert!(matches!(stranger, Err(ServiceError::CartItemNotFound(_))));
        assert_eq!(cart.view(user).await.unwrap().items.len(), 1);

        cart.remove_item(user, item.id()).await.unwrap();
        assert!(cart.view(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn view_prices_the_cart() {
        let (cart, user, book) = setup(5).await;
        cart.add_or_update(user, book.id(), 2).await.unwrap();

        let view = cart.view(user).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].title, "Neuromancer");
        assert_eq!(view.total_price_cents, 2598);
    }
}
