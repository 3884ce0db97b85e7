//! Shared newtypes and utilities used across all modules.

pub mod units;

use ethers_core::types::Address;
use ethers_core::utils::to_checksum;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

use crate::error::MarketError;

// ─── ProductId ───────────────────────────────────────────────────────────────

/// Chain-assigned marketplace item id. 1-based and stable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductId(u64);

impl ProductId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for ProductId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(ProductId)
    }
}

impl Serialize for ProductId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(ProductId)
    }
}

// ─── Addresses ───────────────────────────────────────────────────────────────

/// Parse a user-supplied account address.
///
/// Accepts 40 hex digits with or without a `0x` prefix. All-lowercase and
/// all-uppercase inputs are accepted as-is; mixed-case input must carry a
/// valid EIP-55 checksum.
pub fn parse_address(input: &str) -> Result<Address, MarketError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() != 40 {
        return Err(MarketError::Validation(format!(
            "Invalid address '{}': expected 40 hex digits",
            input
        )));
    }

    let bytes = hex::decode(digits)
        .map_err(|e| MarketError::Validation(format!("Invalid address '{}': {}", input, e)))?;
    let address = Address::from_slice(&bytes);

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        let checksummed = checksum(&address);
        if checksummed[2..] != *digits {
            return Err(MarketError::Validation(format!(
                "Invalid address '{}': bad checksum",
                input
            )));
        }
    }

    Ok(address)
}

/// EIP-55 checksummed representation of an address.
pub fn checksum(address: &Address) -> String {
    to_checksum(address, None)
}
