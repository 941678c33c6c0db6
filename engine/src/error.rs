//! Rejection reasons for marketplace commands

use serde::{Deserialize, Serialize};

/// Why a command was refused
///
/// Every rejection leaves state untouched except for recording itself in
/// `MarketState::last_rejection`, with one exception: an unavailable or
/// expired room is deactivated as part of refusing the join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum Rejection {
    /// No units left for the product
    #[error("this product is out of stock")]
    OutOfStock,

    /// Only one unit left; a group purchase needs at least two
    #[error("cannot open a group purchase with a single unit in stock")]
    InsufficientReserve,

    /// The product has no group price configured
    #[error("this product does not offer a group price")]
    NoGroupPrice,

    /// The room has already closed
    #[error("this group purchase is closed")]
    RoomClosed,

    /// The room is full or its product ran out of stock
    #[error("this group purchase is no longer available")]
    RoomUnavailable,

    /// The buyer is already a participant (soft failure, no state change)
    #[error("you already joined this group purchase")]
    AlreadyJoined,

    /// The caller is not a registered buyer
    #[error("only registered buyers can place orders")]
    NotAuthorized,

    /// A referenced entity does not exist
    #[error("{what} not found")]
    NotFound {
        /// What kind of entity was missing
        #[serde(skip_deserializing)]
        what: &'static str,
    },
}

impl Rejection {
    /// Soft rejections are expected user behavior, not errors
    ///
    /// A duplicate join is reported at warning level and never mutates the
    /// room; everything else is a hard refusal.
    #[must_use]
    pub const fn is_soft(&self) -> bool {
        matches!(self, Self::AlreadyJoined)
    }
}
