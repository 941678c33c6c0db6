//! Group purchase rooms and their lifecycle
//!
//! A room moves through three observable states: open (active with seats
//! left), full (active at capacity, closing imminently) and closed. Closing
//! is terminal; a closed room never reopens and never admits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BuyerId, Money, ProductId, RoomId};

/// Observable lifecycle state, derived from the room's fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    /// Active, accepting participants
    Open,
    /// Active but at capacity
    Full,
    /// Terminal; no further joins
    Closed,
}

/// Why a room closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    /// Participant count reached the maximum
    CapacityReached,
    /// The product ran out of stock
    StockExhausted,
    /// The expiration time passed
    Expired,
    /// Closed deliberately after reaching the minimum viable size
    QuorumReached,
}

/// A group purchase room for one product
///
/// The participant list, recomputed total price and active flag only change
/// together, inside a reduction step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier
    pub id: RoomId,
    /// Product being purchased
    pub product_id: ProductId,
    /// Buyer who opened the room
    pub opened_by: BuyerId,
    /// Participants in join order
    pub participants: Vec<BuyerId>,
    /// False once the room has closed
    pub is_active: bool,
    /// Private rooms are hidden from public listings
    pub is_private: bool,
    /// Aggregate price: participant count times the group price
    pub total_price: Money,
    /// Optional deadline; checked lazily on access
    pub expiration_time: Option<DateTime<Utc>>,
    /// When the room was opened
    pub created_at: DateTime<Utc>,
    /// Why the room closed, once it has
    pub close_reason: Option<CloseReason>,
}

impl Room {
    /// Open a new, empty room
    #[must_use]
    pub fn open(
        id: RoomId,
        product_id: ProductId,
        opened_by: BuyerId,
        is_private: bool,
        expiration_time: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            product_id,
            opened_by,
            participants: Vec::new(),
            is_active: true,
            is_private,
            total_price: Money::ZERO,
            expiration_time,
            created_at,
            close_reason: None,
        }
    }

    /// Number of participants admitted so far
    #[must_use]
    pub fn participant_count(&self) -> u32 {
        u32::try_from(self.participants.len()).unwrap_or(u32::MAX)
    }

    /// True if the buyer has already joined
    #[must_use]
    pub fn has_participant(&self, buyer: &BuyerId) -> bool {
        self.participants.contains(buyer)
    }

    /// True once the deadline has passed; rooms without one never expire
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time.is_some_and(|deadline| now >= deadline)
    }

    /// Derived lifecycle state given the product's capacity
    #[must_use]
    pub fn status(&self, max_participants: u32) -> RoomStatus {
        if !self.is_active {
            RoomStatus::Closed
        } else if self.participant_count() >= max_participants {
            RoomStatus::Full
        } else {
            RoomStatus::Open
        }
    }

    /// Admit a participant and recompute the aggregate price
    ///
    /// The caller has already validated capacity, stock and duplicates; this
    /// only records the admission.
    pub(crate) fn admit(&mut self, buyer: BuyerId, group_price: Money) {
        debug_assert!(self.is_active, "admission into a closed room");
        debug_assert!(!self.has_participant(&buyer), "duplicate admission");
        self.participants.push(buyer);
        self.total_price = group_price.times(self.participant_count());
    }

    /// Close the room; returns false if it was already closed
    ///
    /// The first close wins. Callers use the return value to fire the
    /// completion notification exactly once.
    pub(crate) fn close(&mut self, reason: CloseReason) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.close_reason = Some(reason);
        true
    }

    /// Close if the minimum viable size has been reached
    ///
    /// Returns true when the room transitioned on this call.
    pub(crate) fn close_if_quorum(&mut self, min_participants: u32) -> bool {
        if self.is_active && self.participant_count() >= min_participants {
            self.close(CloseReason::QuorumReached)
        } else {
            false
        }
    }
}
