//! Buyer identity lookups
//!
//! The engine does not own user accounts. It asks an [`IdentityDirectory`]
//! two questions: is this caller a registered buyer, and where do we reach
//! them when their group purchase completes.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::types::BuyerId;

/// Read-only view of the buyer registry
pub trait IdentityDirectory: Send + Sync {
    /// True when the id belongs to a registered buyer
    fn is_buyer(&self, buyer: &BuyerId) -> bool;

    /// Contact address for completion notices, if the buyer has one
    fn contact_address(&self, buyer: &BuyerId) -> Option<String>;
}

/// Fixed in-memory directory
///
/// Buyers are registered up front; useful for the demo and for tests that
/// need some callers authorized and others not.
#[derive(Debug, Default)]
pub struct StaticIdentityDirectory {
    buyers: Mutex<HashMap<BuyerId, Option<String>>>,
}

impl StaticIdentityDirectory {
    /// Create an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a buyer, optionally with a contact address
    pub fn register(&self, buyer: BuyerId, address: Option<&str>) {
        #[allow(clippy::unwrap_used)]
        let mut buyers = self.buyers.lock().unwrap();
        buyers.insert(buyer, address.map(str::to_owned));
    }
}

impl IdentityDirectory for StaticIdentityDirectory {
    fn is_buyer(&self, buyer: &BuyerId) -> bool {
        #[allow(clippy::unwrap_used)]
        let buyers = self.buyers.lock().unwrap();
        buyers.contains_key(buyer)
    }

    fn contact_address(&self, buyer: &BuyerId) -> Option<String> {
        #[allow(clippy::unwrap_used)]
        let buyers = self.buyers.lock().unwrap();
        buyers.get(buyer).cloned().flatten()
    }
}

/// Directory that treats everyone as a registered buyer with no address
///
/// Handy when a test does not care about authorization.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveIdentity;

impl IdentityDirectory for PermissiveIdentity {
    fn is_buyer(&self, _buyer: &BuyerId) -> bool {
        true
    }

    fn contact_address(&self, _buyer: &BuyerId) -> Option<String> {
        None
    }
}
