//! Retry policies for JSON-RPC requests.
//!
//! Only requests that cannot change chain state or open a wallet prompt are
//! ever retried. Everything else goes out exactly once.

use std::time::Duration;

use rand::Rng;

use crate::error::RpcError;

/// JSON-RPC error code public nodes use for rate limiting.
pub const LIMIT_EXCEEDED_CODE: i64 = -32005;

/// RPC methods that never change state and never prompt the user.
const READ_ONLY_METHODS: &[&str] = &[
    "eth_accounts",
    "eth_blockNumber",
    "eth_call",
    "eth_chainId",
    "eth_getBalance",
    "eth_getTransactionReceipt",
    "net_version",
];

/// How a single JSON-RPC request is retried.
#[derive(Debug, Clone, Default)]
pub enum RetryPolicy {
    /// Send once. Wallet prompts and transaction submission use this.
    #[default]
    None,
    /// [`RetryConfig::idempotent`]. Read-only methods use this.
    Idempotent,
    Custom(RetryConfig),
}

impl RetryPolicy {
    /// Default policy for a JSON-RPC method.
    pub fn for_method(method: &str) -> Self {
        if READ_ONLY_METHODS.contains(&method) {
            RetryPolicy::Idempotent
        } else {
            RetryPolicy::None
        }
    }

    /// The config to retry with, or `None` for send-once.
    pub fn config(&self) -> Option<RetryConfig> {
        match self {
            RetryPolicy::None => None,
            RetryPolicy::Idempotent => Some(RetryConfig::idempotent()),
            RetryPolicy::Custom(config) => Some(config.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    /// Spread each delay by up to ±25%.
    pub jitter: bool,
    /// HTTP statuses worth another attempt.
    pub retryable_statuses: Vec<u16>,
    /// JSON-RPC error codes worth another attempt.
    pub retryable_codes: Vec<i64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
            backoff_factor: 2.0,
            jitter: true,
            retryable_statuses: vec![502, 503, 504],
            retryable_codes: Vec::new(),
        }
    }
}

impl RetryConfig {
    /// Config for read-only calls: also backs off on rate limiting.
    pub fn idempotent() -> Self {
        Self {
            retryable_statuses: vec![429, 502, 503, 504],
            retryable_codes: vec![LIMIT_EXCEEDED_CODE],
            ..Self::default()
        }
    }

    /// Whether `err` is worth another attempt under this config.
    pub fn should_retry(&self, err: &RpcError) -> bool {
        match err {
            RpcError::ServerError { status, .. } => self.retryable_statuses.contains(status),
            RpcError::Rpc { code, .. } => self.retryable_codes.contains(code),
            RpcError::Timeout => true,
            #[cfg(feature = "http")]
            RpcError::Reqwest(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }

    /// Backoff before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let max_ms = self.max_delay.as_secs_f64() * 1000.0;
        let scaled_ms = self.initial_delay.as_secs_f64()
            * 1000.0
            * self.backoff_factor.powi(attempt.min(i32::MAX as u32) as i32);
        // `f64::min` ignores NaN; overflowed factors land on the cap.
        let mut delay_ms = scaled_ms.min(max_ms).max(0.0);
        if self.jitter {
            delay_ms *= rand::thread_rng().gen_range(0.75..=1.25);
        }
        Duration::from_nanos((delay_ms * 1_000_000.0) as u64)
    }
}
