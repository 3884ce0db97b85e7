//! Network and timing defaults for the SDK.

use std::time::Duration;

/// Default JSON-RPC endpoint (local development node).
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Environment variable holding the marketplace contract address.
pub const CONTRACT_ADDRESS_ENV: &str = "MARKET_CONTRACT_ADDRESS";

/// Environment variable overriding [`DEFAULT_RPC_URL`].
pub const RPC_URL_ENV: &str = "MARKET_RPC_URL";

/// How often the provider watchdog compares provider identity.
pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_secs(3);

/// Delay between `eth_getTransactionReceipt` polls.
pub const DEFAULT_CONFIRMATION_POLL: Duration = Duration::from_secs(1);

/// Receipt polls before a pending transaction is reported as timed out.
pub const DEFAULT_CONFIRMATION_ATTEMPTS: u32 = 120;

/// Capacity of the outcome event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
