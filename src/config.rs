//! Deployment configuration.
//!
//! The contract address is the one required parameter. A missing or malformed
//! address is a construction-time [`MarketError::Config`], never a runtime
//! fault.

use std::time::Duration;

use ethers_core::types::Address;

use crate::error::MarketError;
use crate::network::{
    CONTRACT_ADDRESS_ENV, DEFAULT_CONFIRMATION_ATTEMPTS, DEFAULT_CONFIRMATION_POLL,
    DEFAULT_RPC_URL, DEFAULT_WATCHDOG_INTERVAL, RPC_URL_ENV,
};
use crate::shared::parse_address;

/// Receipt polling settings for pending transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_CONFIRMATION_POLL,
            max_attempts: DEFAULT_CONFIRMATION_ATTEMPTS,
        }
    }
}

/// Resolved SDK configuration.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Deployed marketplace contract.
    pub contract_address: Address,
    /// JSON-RPC endpoint used when the SDK builds its own `HttpProvider`.
    pub rpc_url: String,
    /// Provider watchdog period.
    pub watchdog_interval: Duration,
    pub confirmation: ConfirmationConfig,
}

impl MarketConfig {
    pub fn new(contract_address: Address) -> Self {
        Self {
            contract_address,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            confirmation: ConfirmationConfig::default(),
        }
    }

    /// Read `MARKET_CONTRACT_ADDRESS` (required) and `MARKET_RPC_URL`.
    pub fn from_env() -> Result<Self, MarketError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, MarketError> {
        let raw = lookup(CONTRACT_ADDRESS_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                MarketError::Config(format!("{} is not set", CONTRACT_ADDRESS_ENV))
            })?;
        let mut config = Self::new(parse_contract_address(&raw)?);
        if let Some(url) = lookup(RPC_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config.rpc_url = url;
        }
        Ok(config)
    }
}

/// Parse a configured contract address, reporting failures as config errors.
pub(crate) fn parse_contract_address(raw: &str) -> Result<Address, MarketError> {
    parse_address(raw).map_err(|e| MarketError::Config(format!("contract address: {}", e.message())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_contract_address_is_config_error() {
        let result = MarketConfig::from_lookup(env(&[]));
        assert!(matches!(result, Err(MarketError::Config(_))));
    }

    #[test]
    fn test_blank_contract_address_is_config_error() {
        let result = MarketConfig::from_lookup(env(&[(CONTRACT_ADDRESS_ENV, "  ")]));
        assert!(matches!(result, Err(MarketError::Config(_))));
    }

    #[test]
    fn test_malformed_contract_address_is_config_error() {
        let result = MarketConfig::from_lookup(env(&[(CONTRACT_ADDRESS_ENV, "0x1234")]));
        assert!(matches!(result, Err(MarketError::Config(_))));
    }

    #[test]
    fn test_from_lookup_with_overrides() {
        let config = MarketConfig::from_lookup(env(&[
            (
                CONTRACT_ADDRESS_ENV,
                "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            ),
            (RPC_URL_ENV, "http://node:8545"),
        ]))
        .unwrap();
        assert_eq!(config.rpc_url, "http://node:8545");
        assert_eq!(config.watchdog_interval, DEFAULT_WATCHDOG_INTERVAL);
    }
}
