//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{BookId, Money, OrderId, UserId};
use serde::Serialize;

use super::state::TransitionDenied;
use super::{
    CancellationPolicy, CheckoutRequest, LineItemDraft, OrderError, OrderLineItem, OrderStatus,
    Transition,
};

/// Order aggregate root.
///
/// Line items, prices and the total are frozen when the order is placed;
/// only the status changes afterwards, and only through [`Order::transition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    items: Vec<OrderLineItem>,
    total_price: Money,
    status: OrderStatus,
    payment_method: Option<String>,
    recipient_name: String,
    recipient_phone: String,
    shipping_address: String,
    created_at: DateTime<Utc>,
}

/// Stored state of an order, used to rebuild the aggregate.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderLineItem>,
    pub total_price: Money,
    pub status: OrderStatus,
    pub payment_method: Option<String>,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a permitted status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub transition: Transition,
}

impl StatusChange {
    pub fn is_noop(&self) -> bool {
        self.transition == Transition::Unchanged
    }

    pub fn restores_stock(&self) -> bool {
        self.transition == Transition::Cancel
    }
}

impl Order {
    /// Places a new `Pending` order from priced lines.
    pub fn place(
        user_id: UserId,
        request: &CheckoutRequest,
        lines: Vec<LineItemDraft>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        request.validate()?;
        if lines.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let id = OrderId::new();
        let items = lines
            .into_iter()
            .map(|draft| OrderLineItem::attach(id, draft))
            .collect::<Result<Vec<_>, _>>()?;
        let total_price = Money::checked_sum(items.iter().map(OrderLineItem::subtotal))
            .ok_or(OrderError::AmountOverflow)?;

        Ok(Self {
            id,
            user_id,
            items,
            total_price,
            status: OrderStatus::Pending,
            payment_method: request.payment_label(),
            recipient_name: request.recipient_name.trim().to_string(),
            recipient_phone: request.recipient_phone.trim().to_string(),
            shipping_address: request.shipping_address.trim().to_string(),
            created_at,
        })
    }

    /// Rebuilds an order from stored state. The stored total is kept as is.
    pub fn from_parts(parts: OrderParts) -> Self {
        Self {
            id: parts.id,
            user_id: parts.user_id,
            items: parts.items,
            total_price: parts.total_price,
            status: parts.status,
            payment_method: parts.payment_method,
            recipient_name: parts.recipient_name,
            recipient_phone: parts.recipient_phone,
            shipping_address: parts.shipping_address,
            created_at: parts.created_at,
        }
    }

    /// Applies a status change if the state machine permits it.
    pub fn transition(
        &mut self,
        target: OrderStatus,
        policy: CancellationPolicy,
    ) -> Result<StatusChange, OrderError> {
        let transition =
            self.status
                .transition_to(target, policy)
                .map_err(|denied| match denied {
                    TransitionDenied::PaidCancellation => {
                        OrderError::IllegalCancellation { order_id: self.id }
                    }
                    TransitionDenied::Finalized => OrderError::OrderFinalized {
                        order_id: self.id,
                        requested: target,
                    },
                })?;

        let change = StatusChange {
            order_id: self.id,
            from: self.status,
            to: target,
            transition,
        };
        self.status = target;
        Ok(change)
    }

    /// (book, quantity) pairs to put back into stock on cancellation.
    pub fn restock_lines(&self) -> impl Iterator<Item = (BookId, u32)> + '_ {
        self.items
            .iter()
            .map(|item| (item.book_id(), item.quantity()))
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    pub fn items(&self) -> &[OrderLineItem] {
        &self.items
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_method(&self) -> Option<&str> {
        self.payment_method.as_deref()
    }

    pub fn recipient_name(&self) -> &str {
        &self.recipient_name
    }

    pub fn recipient_phone(&self) -> &str {
        &self.recipient_phone
    }

    pub fn shipping_address(&self) -> &str {
        &self.shipping_address
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            payment_method: Some("CREDIT_CARD".to_string()),
            recipient_name: "Test Receiver".to_string(),
            recipient_phone: "0912345678".to_string(),
            shipping_address: "Test Address".to_string(),
        }
    }

    fn draft(title: &str, quantity: u32, price_cents: i64) -> LineItemDraft {
        LineItemDraft {
            book_id: BookId::new(),
            book_title: title.to_string(),
            quantity,
            unit_price: Money::from_cents(price_cents),
        }
    }

    fn placed_order() -> Order {
        Order::place(
            UserId::new(),
            &request(),
            vec![draft("A", 2, 10_000), draft("B", 1, 550)],
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_place_sums_subtotals() {
        let order = placed_order();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total_price().cents(), 20_550);
        assert_eq!(order.items().len(), 2);
        assert!(order.items().iter().all(|item| item.order_id() == order.id()));
        assert_eq!(order.payment_method(), Some("CREDIT_CARD"));
    }

    #[test]
    fn test_place_requires_lines() {
        let result = Order::place(UserId::new(), &request(), vec![], Utc::now());
        assert!(matches!(result, Err(OrderError::EmptyCart)));
    }

    #[test]
    fn test_place_requires_recipient() {
        let mut req = request();
        req.shipping_address = String::new();
        let result = Order::place(UserId::new(), &req, vec![draft("A", 1, 100)], Utc::now());
        assert!(matches!(result, Err(OrderError::MissingField { .. })));
    }

    #[test]
    fn test_place_rejects_overflowing_amounts() {
        let line = Order::place(
            UserId::new(),
            &request(),
            vec![draft("A", 3, i64::MAX / 2)],
            Utc::now(),
        );
        assert!(matches!(line, Err(OrderError::AmountOverflow)));

        let total = Order::place(
            UserId::new(),
            &request(),
            vec![
                draft("A", 1, i64::MAX / 2),
                draft("B", 1, i64::MAX / 2),
                draft("C", 1, 2),
            ],
            Utc::now(),
        );
        let err = total.unwrap_err();
        assert!(matches!(err, OrderError::AmountOverflow));
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn test_from_parts_keeps_stored_total() {
        let order = placed_order();
        let rebuilt = Order::from_parts(OrderParts {
            id: order.id(),
            user_id: order.user_id(),
            items: order.items().to_vec(),
            total_price: Money::from_cents(1),
            status: OrderStatus::Paid,
            payment_method: None,
            recipient_name: order.recipient_name().to_string(),
            recipient_phone: order.recipient_phone().to_string(),
            shipping_address: order.shipping_address().to_string(),
            created_at: order.created_at(),
        });
        assert_eq!(rebuilt.total_price().cents(), 1);
        assert_eq!(rebuilt.status(), OrderStatus::Paid);
    }

    #[test]
    fn test_cancel_pending_reports_restock() {
        let mut order = placed_order();
        let change = order
            .transition(OrderStatus::Cancelled, CancellationPolicy::Guarded)
            .unwrap();
        assert!(change.restores_stock());
        assert_eq!(change.from, OrderStatus::Pending);
        assert_eq!(order.status(), OrderStatus::Cancelled);

        let restock: Vec<u32> = order.restock_lines().map(|(_, qty)| qty).collect();
        assert_eq!(restock, vec![2, 1]);
    }

    #[test]
    fn test_recancel_is_noop() {
        let mut order = placed_order();
        order
            .transition(OrderStatus::Cancelled, CancellationPolicy::Guarded)
            .unwrap();
        let change = order
            .transition(OrderStatus::Cancelled, CancellationPolicy::Guarded)
            .unwrap();
        assert!(change.is_noop());
        assert!(!change.restores_stock());
    }

    #[test]
    fn test_guarded_paid_cancellation_keeps_status() {
        let mut order = placed_order();
        order
            .transition(OrderStatus::Paid, CancellationPolicy::Guarded)
            .unwrap();

        let err = order
            .transition(OrderStatus::Cancelled, CancellationPolicy::Guarded)
            .unwrap_err();
        assert!(matches!(err, OrderError::IllegalCancellation { .. }));
        assert!(err.to_string().contains("refund workflow"));
        assert_eq!(order.status(), OrderStatus::Paid);

        let change = order
            .transition(OrderStatus::Cancelled, CancellationPolicy::Override)
            .unwrap();
        assert!(change.restores_stock());
    }

    #[test]
    fn test_cancelled_order_cannot_reopen() {
        let mut order = placed_order();
        order
            .transition(OrderStatus::Cancelled, CancellationPolicy::Guarded)
            .unwrap();
        let err = order
            .transition(OrderStatus::Pending, CancellationPolicy::Override)
            .unwrap_err();
        assert!(matches!(err, OrderError::OrderFinalized { .. }));
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }
}
