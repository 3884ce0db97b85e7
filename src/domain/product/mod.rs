//! Product domain: cached marketplace items.

mod convert;
pub mod state;
pub mod store;
pub mod wire;

use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::shared::units::format_ether;
use crate::shared::ProductId;

// ─── ProductKey ──────────────────────────────────────────────────────────────

/// Identity of a cached product.
///
/// Only `Confirmed` keys come from the chain. A `Placeholder` is the
/// client-side stand-in for an optimistic add; its number is an index, not a
/// contract id, and is replaced on the next full fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ProductKey {
    Confirmed(ProductId),
    Placeholder(u64),
}

// ─── Product ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub key: ProductKey,
    pub name: String,
    pub price_wei: U256,
    pub owner: Address,
    pub sold: bool,
}

impl Product {
    /// The contract id, if this entry has been confirmed by a fetch.
    ///
    /// Purchase and transfer take a [`ProductId`], so placeholder entries
    /// cannot be used to key a write.
    pub fn id(&self) -> Option<ProductId> {
        match self.key {
            ProductKey::Confirmed(id) => Some(id),
            ProductKey::Placeholder(_) => None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.key, ProductKey::Confirmed(_))
    }

    pub fn is_owned_by(&self, account: &Address) -> bool {
        self.owner == *account
    }

    /// Whether `account` may be offered a purchase of this product.
    pub fn is_purchasable_by(&self, account: &Address) -> bool {
        self.is_confirmed() && !self.sold && !self.is_owned_by(account)
    }

    /// Price in ether, for display.
    pub fn price_ether(&self) -> String {
        format_ether(self.price_wei)
    }

    pub(crate) fn placeholder(index: u64, name: &str, price_wei: U256, owner: Address) -> Self {
        Self {
            key: ProductKey::Placeholder(index),
            name: name.to_string(),
            price_wei,
            owner,
            sold: false,
        }
    }
}
