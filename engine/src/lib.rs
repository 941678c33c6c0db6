//! # GroupBuy Engine
//!
//! Lifecycle engine for group purchases: rooms open against a product,
//! admit participants one at a time, and close when they fill up, run out
//! of stock, expire, or reach quorum.
//!
//! The whole marketplace reduces through a single [`market::MarketReducer`]
//! driven by the store in `groupbuy-runtime`. Because the store serializes
//! reductions, each command is an atomic unit: a join admits the buyer,
//! recomputes the room total, debits one unit of stock and issues the
//! order together, or rejects and leaves everything untouched.
//!
//! ## Quick start
//!
//! ```ignore
//! use groupbuy_engine::prelude::*;
//! use groupbuy_runtime::Store;
//!
//! let store = Store::new(
//!     MarketState::new(),
//!     MarketReducer::new(),
//!     MarketEnvironment::live(),
//! );
//! store.send(MarketAction::JoinRoom { room_id, buyer_id }).await?;
//! ```

pub mod availability;
pub mod directory;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod market;
pub mod notifier;
pub mod orders;
pub mod room;
pub mod types;

/// Commonly used items in one import
pub mod prelude {
    pub use crate::availability::AvailabilityGate;
    pub use crate::error::Rejection;
    pub use crate::identity::{IdentityDirectory, PermissiveIdentity, StaticIdentityDirectory};
    pub use crate::market::{MarketAction, MarketEnvironment, MarketReducer};
    pub use crate::notifier::{CompletionNotice, CompletionNotifier, LoggingNotifier};
    pub use crate::orders::{Order, OrderKind};
    pub use crate::room::{CloseReason, Room, RoomStatus};
    pub use crate::types::{
        BuyerId, MarketState, Money, OrderId, Product, ProductId, RoomId,
    };
}
