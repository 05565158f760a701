//! Order summary and detail views.

use chrono::{DateTime, Utc};
use common::{BookId, LineItemId, OrderId, UserId};
use domain::{Order, OrderLineItem, OrderStatus};
use serde::Serialize;

/// Label shown when an order was placed without a payment method.
pub const UNKNOWN_PAYMENT: &str = "UNKNOWN";

/// One row of an order list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_price_cents: i64,
    pub created_at: DateTime<Utc>,
    pub payment_method: String,
}

/// A purchased line as shown in an order detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItemView {
    pub line_item_id: LineItemId,
    pub book_id: BookId,
    pub book_title: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

/// A single order with recipient information and every line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub summary: OrderSummary,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub shipping_address: String,
    pub items: Vec<LineItemView>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id(),
            user_id: order.user_id(),
            status: order.status(),
            total_price_cents: order.total_price().cents(),
            created_at: order.created_at(),
            payment_method: order
                .payment_method()
                .unwrap_or(UNKNOWN_PAYMENT)
                .to_string(),
        }
    }
}

impl From<&OrderLineItem> for LineItemView {
    fn from(item: &OrderLineItem) -> Self {
        Self {
            line_item_id: item.id(),
            book_id: item.book_id(),
            book_title: item.book_title().to_string(),
            quantity: item.quantity(),
            unit_price_cents: item.unit_price().cents(),
            subtotal_cents: item.subtotal().cents(),
        }
    }
}

impl From<&Order> for OrderDetail {
    fn from(order: &Order) -> Self {
        Self {
            summary: OrderSummary::from(order),
            recipient_name: order.recipient_name().to_string(),
            recipient_phone: order.recipient_phone().to_string(),
            shipping_address: order.shipping_address().to_string(),
            items: order.items().iter().map(LineItemView::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use domain::{Book, BookDetails, CheckoutRequest, Language, LineItemDraft};

    fn book(title: &str, price_cents: i64) -> Book {
        Book::new(BookDetails {
            title: title.to_string(),
            author: "Author".to_string(),
            isbn: format!("isbn-{title}"),
            description: None,
            price: Money::from_cents(price_cents),
            stock: 10,
            on_sale: true,
            language: Language::parse("en").unwrap(),
        })
        .unwrap()
    }

    fn order(payment_method: Option<&str>) -> Order {
        let request = CheckoutRequest {
            payment_method: payment_method.map(str::to_string),
            recipient_name: "Ada".to_string(),
            recipient_phone: "555-0100".to_string(),
            shipping_address: "1 Main St".to_string(),
        };
        Order::place(
            UserId::new(),
            &request,
            vec![
                LineItemDraft::for_book(&book("Book X", 10_000), 2),
                LineItemDraft::for_book(&book("Book Y", 250), 3),
            ],
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn summary_copies_order_totals() {
        let order = order(Some("CARD"));
        let summary = OrderSummary::from(&order);

        assert_eq!(summary.order_id, order.id());
        assert_eq!(summary.status, OrderStatus::Pending);
        assert_eq!(summary.total_price_cents, 20_750);
        assert_eq!(summary.payment_method, "CARD");
    }

    #[test]
    fn missing_payment_method_reads_as_unknown() {
        let order = order(None);
        assert_eq!(OrderSummary::from(&order).payment_method, UNKNOWN_PAYMENT);
        assert_eq!(OrderDetail::from(&order).summary.payment_method, UNKNOWN_PAYMENT);
    }

    #[test]
    fn detail_lists_lines_in_checkout_order() {
        let order = order(Some("CASH_ON_DELIVERY"));
        let detail = OrderDetail::from(&order);

        assert_eq!(detail.recipient_name, "Ada");
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].book_title, "Book X");
        assert_eq!(detail.items[0].subtotal_cents, 20_000);
        assert_eq!(detail.items[1].unit_price_cents, 250);
        assert_eq!(detail.items[1].subtotal_cents, 750);
    }

    #[test]
    fn detail_serializes_flat() {
        let detail = OrderDetail::from(&order(None));
        let json = serde_json::to_value(&detail).unwrap();

        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["total_price_cents"], 20_750);
        assert_eq!(json["items"][0]["quantity"], 2);
        assert!(json.get("summary").is_none());
    }
}
