//! Stock ledger: live unit counts per product
//!
//! Stock only moves inside a reduction step, so the ledger itself is plain
//! data. The invariant it protects: a count never goes below zero, and a
//! group admission debits exactly one unit.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Rejection;
use crate::types::ProductId;

/// Per-product stock counts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockLedger {
    counts: HashMap<ProductId, u32>,
}

impl StockLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the count for a product, replacing any previous value
    pub fn seed(&mut self, product_id: ProductId, quantity: u32) {
        self.counts.insert(product_id, quantity);
    }

    /// Units currently available; unknown products have zero
    #[must_use]
    pub fn available(&self, product_id: &ProductId) -> u32 {
        self.counts.get(product_id).copied().unwrap_or(0)
    }

    /// True when no units remain
    #[must_use]
    pub fn is_exhausted(&self, product_id: &ProductId) -> bool {
        self.available(product_id) == 0
    }

    /// Debit one unit if available, returning the remaining count
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::OutOfStock`] when no units remain.
    pub fn try_debit(&mut self, product_id: &ProductId) -> Result<u32, Rejection> {
        match self.counts.get_mut(product_id) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(*count)
            }
            _ => Err(Rejection::OutOfStock),
        }
    }

    /// Return units to the ledger
    pub fn credit(&mut self, product_id: ProductId, quantity: u32) {
        *self.counts.entry(product_id).or_insert(0) += quantity;
    }
}
