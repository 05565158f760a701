//! Order status state machine.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──┬──► Paid ──┬──► Shipped
///           │           │
///           │           └──► Cancelled (override only)
///           └──────────────► Cancelled
/// ```
///
/// `Cancelled` is terminal. Re-cancelling is accepted as a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order placed, awaiting payment.
    #[default]
    Pending,

    /// Payment received.
    Paid,

    /// Handed over for delivery.
    Shipped,

    /// Order withdrawn; its stock has been restored.
    Cancelled,
}

/// Whether the paid-order cancellation guard applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationPolicy {
    /// Paid orders cannot be cancelled.
    Guarded,
    /// Elevated callers may cancel paid orders.
    Override,
}

/// What a permitted status change has to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Target equals the current status; nothing is written.
    Unchanged,
    /// Status is overwritten, nothing else changes.
    Set,
    /// Order moves into `Cancelled`; every line's stock goes back to the catalog.
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransitionDenied {
    PaidCancellation,
    Finalized,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Cancelled,
    ];

    /// Parses a status name, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, OrderError> {
        let normalized = raw.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| OrderError::InvalidStatus {
                value: raw.to_string(),
            })
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }

    pub(crate) fn transition_to(
        self,
        target: OrderStatus,
        policy: CancellationPolicy,
    ) -> Result<Transition, TransitionDenied> {
        use OrderStatus::*;

        match (self, target) {
            (current, target) if current == target => Ok(Transition::Unchanged),
            (Cancelled, _) => Err(TransitionDenied::Finalized),
            (Paid, Cancelled) if policy == CancellationPolicy::Guarded => {
                Err(TransitionDenied::PaidCancellation)
            }
            (_, Cancelled) => Ok(Transition::Cancel),
            _ => Ok(Transition::Set),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
