//! Core domain types shared across the engine
//!
//! Identifiers are UUID newtypes so a `RoomId` can never be passed where a
//! `ProductId` is expected. Money is stored as whole cents to keep pricing
//! arithmetic exact.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::error::Rejection;
use crate::ledger::StockLedger;
use crate::orders::Order;
use crate::room::Room;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Access the underlying UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a catalog product
    ProductId
}

uuid_id! {
    /// Unique identifier for a buyer
    BuyerId
}

uuid_id! {
    /// Unique identifier for a group purchase room
    RoomId
}

uuid_id! {
    /// Unique identifier for an order
    OrderId
}

/// Monetary amount in whole cents
///
/// Prices never use floating point. `$9.00` is `Money::from_cents(900)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Create from whole cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Create from a whole-dollar amount
    #[must_use]
    pub const fn from_dollars(dollars: u64) -> Self {
        Self(dollars * 100)
    }

    /// Amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Multiply by a unit count, saturating at the maximum representable
    /// amount
    #[must_use]
    pub const fn times(self, count: u32) -> Self {
        Self(self.0.saturating_mul(count as u64))
    }

    /// Checked addition
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// True when the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Error constructing a [`Product`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductSpecError {
    /// Participant thresholds must be at least 1
    #[error("participant thresholds must be at least 1")]
    ZeroThreshold,
    /// Minimum participants cannot exceed the maximum
    #[error("minimum participants ({min}) exceeds maximum ({max})")]
    MinAboveMax {
        /// Offending minimum
        min: u32,
        /// Offending maximum
        max: u32,
    },
}

/// Catalog snapshot of a purchasable product
///
/// The engine does not own the catalog; products are registered with the
/// pricing and threshold data the lifecycle rules need. Live stock is
/// tracked separately in the [`StockLedger`], `stock_quantity` here is the
/// seed value at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier
    pub id: ProductId,
    /// Display name, used in completion notices
    pub name: String,
    /// Price per unit for individual purchases
    pub unit_price: Money,
    /// Discounted per-unit price for group purchases, if offered
    pub group_price: Option<Money>,
    /// Units available at registration time
    pub stock_quantity: u32,
    /// Minimum participants for a group purchase to be viable
    pub min_participants: u32,
    /// Maximum participants a room can admit
    pub max_participants: u32,
}

impl Product {
    /// Create a product, validating the participant thresholds
    ///
    /// # Errors
    ///
    /// Returns [`ProductSpecError`] when either threshold is zero or the
    /// minimum exceeds the maximum.
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        unit_price: Money,
        group_price: Option<Money>,
        stock_quantity: u32,
        min_participants: u32,
        max_participants: u32,
    ) -> Result<Self, ProductSpecError> {
        if min_participants == 0 || max_participants == 0 {
            return Err(ProductSpecError::ZeroThreshold);
        }
        if min_participants > max_participants {
            return Err(ProductSpecError::MinAboveMax {
                min: min_participants,
                max: max_participants,
            });
        }
        Ok(Self {
            id,
            name: name.into(),
            unit_price,
            group_price,
            stock_quantity,
            min_participants,
            max_participants,
        })
    }

    /// Effective per-unit price for a group purchase
    ///
    /// Falls back to the unit price when no group price is set. Total
    /// recomputation uses this; admission itself still requires an explicit
    /// group price.
    #[must_use]
    pub fn effective_group_price(&self) -> Money {
        self.group_price.unwrap_or(self.unit_price)
    }
}

/// Aggregate state for the whole marketplace lifecycle
///
/// Products, rooms, orders and the stock ledger live in one state struct so
/// that a single reduction step can move all of them together. The store
/// serializes reductions, which makes each join an atomic unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketState {
    /// Registered products by id
    pub products: HashMap<ProductId, Product>,
    /// Live stock counts
    pub stock: StockLedger,
    /// Group purchase rooms by id
    pub rooms: HashMap<RoomId, Room>,
    /// Issued orders by id
    pub orders: HashMap<OrderId, Order>,
    /// Most recent rejection, if the last command failed
    pub last_rejection: Option<Rejection>,
}

impl MarketState {
    /// Create an empty marketplace
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a product
    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.products.get(id)
    }

    /// Look up a room
    #[must_use]
    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    /// Look up an order
    #[must_use]
    pub fn order(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    /// Number of registered products
    #[must_use]
    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    /// Orders placed by a buyer, in no particular order
    #[must_use]
    pub fn orders_for_buyer(&self, buyer: &BuyerId) -> Vec<&Order> {
        self.orders
            .values()
            .filter(|o| o.buyer_id == *buyer)
            .collect()
    }
}
