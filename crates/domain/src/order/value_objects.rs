//! Value objects for the order domain.

use common::{BookId, LineItemId, Money, OrderId};
use serde::{Deserialize, Serialize};

use super::OrderError;
use crate::catalog::Book;

/// A line priced at checkout time, not yet attached to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemDraft {
    pub book_id: BookId,
    pub book_title: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl LineItemDraft {
    /// Captures the book's current price for `quantity` copies.
    pub fn for_book(book: &Book, quantity: u32) -> Self {
        Self {
            book_id: book.id(),
            book_title: book.title().to_string(),
            quantity,
            unit_price: book.price(),
        }
    }

    pub fn subtotal(&self) -> Result<Money, OrderError> {
        self.unit_price
            .checked_multiply(self.quantity)
            .ok_or(OrderError::AmountOverflow)
    }
}

/// One book-quantity-price tuple of an order, frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineItem {
    id: LineItemId,
    order_id: OrderId,
    book_id: BookId,
    book_title: String,
    quantity: u32,
    unit_price: Money,
    subtotal: Money,
}

impl OrderLineItem {
    pub(crate) fn attach(order_id: OrderId, draft: LineItemDraft) -> Result<Self, OrderError> {
        let subtotal = draft.subtotal()?;
        Ok(Self {
            id: LineItemId::new(),
            order_id,
            book_id: draft.book_id,
            book_title: draft.book_title,
            quantity: draft.quantity,
            unit_price: draft.unit_price,
            subtotal,
        })
    }

    /// Rebuilds a line item from stored state.
    pub fn from_parts(
        id: LineItemId,
        order_id: OrderId,
        book_id: BookId,
        book_title: String,
        quantity: u32,
        unit_price: Money,
        subtotal: Money,
    ) -> Self {
        Self {
            id,
            order_id,
            book_id,
            book_title,
            quantity,
            unit_price,
            subtotal,
        }
    }

    pub fn id(&self) -> LineItemId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn book_title(&self) -> &str {
        &self.book_title
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// `unit_price × quantity`, computed once when the line was attached.
    pub fn subtotal(&self) -> Money {
        self.subtotal
    }
}

/// Recipient and payment details supplied at checkout.
///
/// Only presence is checked; the payment method is an opaque label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CheckoutRequest {
    pub payment_method: Option<String>,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub shipping_address: String,
}

impl CheckoutRequest {
    pub fn validate(&self) -> Result<(), OrderError> {
        let required = [
            ("recipient_name", &self.recipient_name),
            ("recipient_phone", &self.recipient_phone),
            ("shipping_address", &self.shipping_address),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(OrderError::MissingField { field });
            }
        }
        Ok(())
    }

    /// The payment label, or `None` when blank.
    pub fn payment_label(&self) -> Option<String> {
        self.payment_method
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            payment_method: Some(" CREDIT_CARD ".to_string()),
            recipient_name: "Test Receiver".to_string(),
            recipient_phone: "0912345678".to_string(),
            shipping_address: "Test Address".to_string(),
        }
    }

    #[test]
    fn test_line_item_subtotal() {
        let item = OrderLineItem::attach(
            OrderId::new(),
            LineItemDraft {
                book_id: BookId::new(),
                book_title: "Dune".to_string(),
                quantity: 3,
                unit_price: Money::from_cents(1000),
            },
        )
        .unwrap();
        assert_eq!(item.subtotal().cents(), 3000);
    }

    #[test]
    fn test_draft_subtotal_overflow_is_rejected() {
        let draft = LineItemDraft {
            book_id: BookId::new(),
            book_title: "Ledger".to_string(),
            quantity: 3,
            unit_price: Money::from_cents(i64::MAX / 2),
        };
        assert!(matches!(draft.subtotal(), Err(OrderError::AmountOverflow)));
        assert!(OrderLineItem::attach(OrderId::new(), draft).is_err());
    }

    #[test]
    fn test_request_requires_recipient_fields() {
        assert!(request().validate().is_ok());

        let mut missing_phone = request();
        missing_phone.recipient_phone = "  ".to_string();
        assert!(matches!(
            missing_phone.validate(),
            Err(OrderError::MissingField {
                field: "recipient_phone"
            })
        ));
    }

    #[test]
    fn test_payment_label_is_trimmed_or_unset() {
        assert_eq!(request().payment_label().as_deref(), Some("CREDIT_CARD"));

        let mut blank = request();
        blank.payment_method = Some("   ".to_string());
        assert_eq!(blank.payment_label(), None);
    }

    #[test]
    fn test_request_deserializes_with_missing_fields() {
        let req: CheckoutRequest =
            serde_json::from_str(r#"{"recipient_name":"Ada"}"#).unwrap();
        assert_eq!(req.payment_method, None);
        assert!(req.validate().is_err());
    }
}
