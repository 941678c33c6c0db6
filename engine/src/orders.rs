//! Orders issued by the engine
//!
//! Every admission into a room issues a group order for one unit at the
//! group price. Individual orders buy any quantity at the unit price and,
//! deliberately, never touch the stock ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

use crate::types::{BuyerId, Money, OrderId, ProductId, RoomId};

/// How the order was placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Direct purchase at the unit price
    Individual,
    /// Issued by admission into a group purchase room
    Group,
}

/// An issued order
///
/// `unit_price_at_purchase` is a snapshot; later catalog price changes never
/// reprice an existing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier
    pub id: OrderId,
    /// Buyer who placed the order
    pub buyer_id: BuyerId,
    /// Product ordered
    pub product_id: ProductId,
    /// Units ordered; always 1 for group orders
    pub quantity: NonZeroU32,
    /// Per-unit price locked in at purchase time
    pub unit_price_at_purchase: Money,
    /// Individual or group
    pub kind: OrderKind,
    /// The room that issued this order, for group orders
    pub room_id: Option<RoomId>,
    /// When the order was issued
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Issue an individual order at the unit price
    #[must_use]
    pub fn individual(
        id: OrderId,
        buyer_id: BuyerId,
        product_id: ProductId,
        quantity: NonZeroU32,
        unit_price: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            buyer_id,
            product_id,
            quantity,
            unit_price_at_purchase: unit_price,
            kind: OrderKind::Individual,
            room_id: None,
            created_at,
        }
    }

    /// Issue the single-unit order that accompanies a room admission
    #[must_use]
    pub fn group(
        id: OrderId,
        buyer_id: BuyerId,
        product_id: ProductId,
        group_price: Money,
        room_id: RoomId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            buyer_id,
            product_id,
            quantity: NonZeroU32::MIN,
            unit_price_at_purchase: group_price,
            kind: OrderKind::Group,
            room_id: Some(room_id),
            created_at,
        }
    }

    /// Total price: quantity times the locked-in unit price
    #[must_use]
    pub fn total(&self) -> Money {
        self.unit_price_at_purchase.times(self.quantity.get())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn individual_order_totals_quantity_times_unit_price() {
        let order = Order::individual(
            OrderId::new(),
            BuyerId::new(),
            ProductId::new(),
            NonZeroU32::new(3).unwrap(),
            Money::from_dollars(10),
            t0(),
        );
        assert_eq!(order.total(), Money::from_dollars(30));
        assert_eq!(order.kind, OrderKind::Individual);
        assert!(order.room_id.is_none());
    }

    #[test]
    fn group_order_is_one_unit_at_group_price() {
        let room_id = RoomId::new();
        let order = Order::group(
            OrderId::new(),
            BuyerId::new(),
            ProductId::new(),
            Money::from_dollars(9),
            room_id,
            t0(),
        );
        assert_eq!(order.quantity.get(), 1);
        assert_eq!(order.total(), Money::from_dollars(9));
        assert_eq!(order.room_id, Some(room_id));
    }
}
