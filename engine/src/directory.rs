//! Read models over the marketplace state
//!
//! Listing and lookup views for callers that render rooms and orders. Views
//! are denormalized snapshots; they borrow nothing and can outlive the
//! state lock they were built under.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::room::RoomStatus;
use crate::types::{BuyerId, MarketState, Money, OrderId, ProductId, RoomId};

/// Snapshot of a room for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomView {
    /// Room identifier
    pub room_id: RoomId,
    /// Product being purchased
    pub product_id: ProductId,
    /// Product display name
    pub product_name: String,
    /// Per-unit group price, if the product still offers one
    pub group_price: Option<Money>,
    /// Current participant count
    pub participant_count: u32,
    /// Capacity from the product
    pub max_participants: u32,
    /// Aggregate price so far
    pub total_price: Money,
    /// Units of stock still available
    pub stock_remaining: u32,
    /// Derived lifecycle state
    pub status: RoomStatus,
    /// When the room was opened
    pub created_at: DateTime<Utc>,
}

/// Snapshot of an order for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    /// Order identifier
    pub order_id: OrderId,
    /// Buyer who placed it
    pub buyer_id: BuyerId,
    /// Product ordered
    pub product_id: ProductId,
    /// Total price at purchase
    pub total: Money,
    /// The room that issued it, for group orders
    pub room_id: Option<RoomId>,
}

fn room_view(state: &MarketState, room: &crate::room::Room) -> RoomView {
    let product = state.products.get(&room.product_id);
    let max_participants = product.map_or(0, |p| p.max_participants);
    RoomView {
        room_id: room.id,
        product_id: room.product_id,
        product_name: product.map_or_else(String::new, |p| p.name.clone()),
        group_price: product.and_then(|p| p.group_price),
        participant_count: room.participant_count(),
        max_participants,
        total_price: room.total_price,
        stock_remaining: state.stock.available(&room.product_id),
        status: room.status(max_participants),
        created_at: room.created_at,
    }
}

/// Public rooms, newest first
///
/// Private rooms never appear here regardless of their state.
#[must_use]
pub fn list_public(state: &MarketState) -> Vec<RoomView> {
    let mut views: Vec<RoomView> = state
        .rooms
        .values()
        .filter(|room| !room.is_private)
        .map(|room| room_view(state, room))
        .collect();
    views.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.room_id.cmp(&a.room_id)));
    views
}

/// First active room purchasing the given product, oldest first
///
/// Used to steer a buyer into an existing group instead of opening a
/// second one.
#[must_use]
pub fn find_open_for_product(state: &MarketState, product_id: &ProductId) -> Option<RoomView> {
    state
        .rooms
        .values()
        .filter(|room| room.product_id == *product_id && room.is_active)
        .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
        .map(|room| room_view(state, room))
}

/// Orders placed by a buyer
#[must_use]
pub fn orders_for_buyer(state: &MarketState, buyer: &BuyerId) -> Vec<OrderView> {
    let mut views: Vec<OrderView> = state
        .orders
        .values()
        .filter(|order| order.buyer_id == *buyer)
        .map(|order| OrderView {
            order_id: order.id,
            buyer_id: order.buyer_id,
            product_id: order.product_id,
            total: order.total(),
            room_id: order.room_id,
        })
        .collect();
    views.sort_by_key(|view| view.order_id);
    views
}
