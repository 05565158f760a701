//! Order service facade.

use common::{OrderId, UserId};
use domain::{CancellationPolicy, CheckoutRequest};
use projections::{OrderDetail, OrderSummary};
use serde::Serialize;
use store::{OrderQuery, Store};

use crate::checkout::CheckoutEngine;
use crate::error::{Result, ServiceError};
use crate::status::StatusMachine;

/// Acknowledgment returned by a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub message: String,
}

impl CheckoutReceipt {
    fn for_order(order_id: OrderId) -> Self {
        Self {
            order_id,
            message: format!("Checkout succeeded! Order ID: {order_id}"),
        }
    }
}

/// Entry point for order operations.
///
/// Write operations go through [`CheckoutEngine`] and [`StatusMachine`];
/// reads return [`OrderSummary`]/[`OrderDetail`] views.
#[derive(Clone)]
pub struct OrderService<S> {
    store: S,
    checkout: CheckoutEngine<S>,
    status: StatusMachine<S>,
}

impl<S: Store + Clone> OrderService<S> {
    /// Creates a new order service.
    pub fn new(store: S) -> Self {
        Self {
            checkout: CheckoutEngine::new(store.clone()),
            status: StatusMachine::new(store.clone()),
            store,
        }
    }

    /// Gets a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Checks out the whole cart of `user_id`.
    pub async fn checkout(
        &self,
        user_id: UserId,
        request: &CheckoutRequest,
    ) -> Result<CheckoutReceipt> {
        let order = self.checkout.checkout(user_id, request).await?;
        Ok(CheckoutReceipt::for_order(order.id()))
    }

    /// Changes an order's status. Cancelling a paid order is refused.
    pub async fn update_status(&self, order_id: OrderId, status: &str) -> Result<OrderDetail> {
        let order = self
            .status
            .apply(order_id, status, CancellationPolicy::Guarded)
            .await?;
        Ok(OrderDetail::from(&order))
    }

    /// Changes an order's status, allowing a paid order to be cancelled.
    ///
    /// Stock restoration and the cancelled-is-final rule still apply.
    pub async fn force_update_status(
        &self,
        order_id: OrderId,
        status: &str,
    ) -> Result<OrderDetail> {
        tracing::warn!(order_id = %order_id, status, "status override requested");
        let order = self
            .status
            .apply(order_id, status, CancellationPolicy::Override)
            .await?;
        Ok(OrderDetail::from(&order))
    }

    /// Fetches one order. With a `viewer`, orders owned by someone else read as missing.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_detail(
        &self,
        order_id: OrderId,
        viewer: Option<UserId>,
    ) -> Result<OrderDetail> {
        let order = self
            .store
            .find_order(order_id)
            .await?
            .filter(|order| viewer.is_none_or(|user_id| order.is_owned_by(user_id)))
            .ok_or(ServiceError::OrderNotFound(order_id))?;
        Ok(OrderDetail::from(&order))
    }

    /// Lists orders newest first, either one user's or everyone's.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, user_id: Option<UserId>) -> Result<Vec<OrderSummary>> {
        let query = match user_id {
            Some(user_id) => OrderQuery::for_user(user_id),
            None => OrderQuery::all(),
        };
        let orders = self.store.list_orders(query).await?;
        Ok(orders.iter().map(OrderSummary::from).collect())
    }
}
