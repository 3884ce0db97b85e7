//! Raw item records as decoded from the contract.

use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::shared::ProductId;

/// One `items(id)` result, tagged with the id it was read under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ProductId,
    pub name: String,
    /// Price in wei.
    pub price: U256,
    pub owner: Address,
    pub sold: bool,
}
