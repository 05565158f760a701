//! Order status transitions with stock restoration.

use common::OrderId;
use domain::{CancellationPolicy, Order, OrderStatus};
use store::{Store, Transaction};

use crate::error::{Result, ServiceError};

/// Applies status changes to stored orders.
///
/// A change into `Cancelled` puts every line's quantity back into stock in
/// the same transaction as the status write. Re-issuing the current status
/// is a no-op that writes nothing.
#[derive(Clone)]
pub struct StatusMachine<S> {
    store: S,
}

impl<S: Store> StatusMachine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Moves `order_id` to the status named by `requested`.
    #[tracing::instrument(skip_all, fields(order_id = %order_id, requested = %requested, policy = ?policy))]
    pub async fn apply(
        &self,
        order_id: OrderId,
        requested: &str,
        policy: CancellationPolicy,
    ) -> Result<Order> {
        let target = OrderStatus::parse(requested)?;
        self.transition(order_id, target, policy).await
    }

    async fn transition(
        &self,
        order_id: OrderId,
        target: OrderStatus,
        policy: CancellationPolicy,
    ) -> Result<Order> {
        let mut tx = self.store.begin().await?;

        let mut order = tx
            .find_order_for_update(order_id)
            .await?
            .ok_or(ServiceError::OrderNotFound(order_id))?;

        let change = order.transition(target, policy).inspect_err(|e| {
            tracing::warn!(error = %e, "status change rejected");
        })?;

        if change.is_noop() {
            tracing::debug!(status = %change.to, "status unchanged");
            return Ok(order);
        }

        let mut restored = 0_u64;
        if change.restores_stock() {
            // Same lock order as checkout.
            let mut lines: Vec<_> = order.restock_lines().collect();
            lines.sort_unstable_by_key(|(book_id, _)| *book_id);
            for (book_id, quantity) in lines {
                let mut book = tx
                    .find_book_for_update(book_id)
                    .await?
                    .ok_or(ServiceError::BookNotFound(book_id))?;
                book.restore_stock(quantity)?;
                tx.save_book(&book).await?;
                restored += 1;
                tracing::debug!(
                    book_id = %book_id,
                    quantity,
                    stock = book.stock(),
                    "stock restored"
                );
            }
        }

        tx.save_order_status(&order).await?;
        tx.commit().await?;

        metrics::counter!(
            "order_status_transitions_total",
            "from" => change.from.as_str(),
            "to" => change.to.as_str()
        )
        .increment(1);
        if restored > 0 {
            metrics::counter!("stock_restorations_total").increment(restored);
        }
        tracing::info!(
            from = %change.from,
            to = %change.to,
            restored_lines = restored,
            "order status changed"
        );

        Ok(order)
    }
}
