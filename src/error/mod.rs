//! Unified SDK error types.
//!
//! Two layers:
//!
//! - [`RpcError`] — raw transport/provider failures, one variant per failure
//!   shape. Never shown to the display layer.
//! - [`MarketError`] — the normalized taxonomy every component returns. Each
//!   variant carries an already human-readable message produced by
//!   [`normalize::extract_error_message`].

pub mod normalize;

use serde_json::{json, Value};
use thiserror::Error;

use crate::coordinator::OperationKey;

/// JSON-RPC error code for a request the user declined (EIP-1193).
pub const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC error code nodes use for `execution reverted` with revert data.
pub const EXECUTION_REVERTED_CODE: i64 = 3;

/// Top-level SDK error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// No wallet provider is installed. The user must install one.
    #[error("No wallet provider found")]
    NoProvider,

    /// The user declined a wallet prompt.
    #[error("User rejected the request: {0}")]
    UserRejected(String),

    /// RPC/transport failure.
    #[error("Network or provider error: {0}")]
    NetworkOrProvider(String),

    /// The chain rejected a write.
    #[error("Transaction reverted: {0}")]
    TransactionReverted(String),

    /// Client-side input was malformed; raised before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation needs both a contract binding and a known account.
    #[error("Wallet not connected")]
    NotConnected,

    /// An operation under the same key is already in flight.
    #[error("Operation already in progress: {0}")]
    Busy(OperationKey),

    /// Missing or malformed deployment configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MarketError {
    /// Whether repeating the same request can succeed without changed input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MarketError::UserRejected(_) | MarketError::NetworkOrProvider(_) | MarketError::Busy(_)
        )
    }

    /// The normalized message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            MarketError::UserRejected(m)
            | MarketError::NetworkOrProvider(m)
            | MarketError::TransactionReverted(m)
            | MarketError::Validation(m)
            | MarketError::Config(m) => m.clone(),
            other => other.to_string(),
        }
    }
}

/// Transport and provider-level errors.
#[derive(Error, Debug)]
pub enum RpcError {
    #[cfg(feature = "http")]
    #[error("Request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// A JSON-RPC error object returned by the node or wallet.
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

impl RpcError {
    /// The failure as a JSON value, in the shape the normalizer inspects.
    ///
    /// HTTP failures carry their body under `response.data` the way HTTP
    /// client libraries report them; JSON-RPC error objects are passed
    /// through as-is.
    pub fn shape(&self) -> Value {
        match self {
            RpcError::Rpc {
                code,
                message,
                data,
            } => json!({ "code": code, "message": message, "data": data }),
            RpcError::ServerError { status, body } => {
                let data = serde_json::from_str::<Value>(body)
                    .unwrap_or_else(|_| Value::String(body.clone()));
                json!({
                    "message": self.to_string(),
                    "response": { "status": status, "data": data },
                })
            }
            other => json!({ "message": other.to_string() }),
        }
    }

    fn is_revert(&self) -> bool {
        match self {
            RpcError::Rpc { code, message, .. } => {
                *code == EXECUTION_REVERTED_CODE || message.to_lowercase().contains("revert")
            }
            _ => false,
        }
    }
}

impl From<RpcError> for MarketError {
    fn from(err: RpcError) -> Self {
        let message = normalize::extract_error_message(&err.shape());
        match &err {
            RpcError::Rpc { code, .. } if *code == USER_REJECTED_CODE => {
                MarketError::UserRejected(message)
            }
            _ if err.is_revert() => MarketError::TransactionReverted(message),
            _ => MarketError::NetworkOrProvider(message),
        }
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        MarketError::NetworkOrProvider(format!("Malformed response: {}", err))
    }
}

impl From<ethers_core::abi::Error> for MarketError {
    fn from(err: ethers_core::abi::Error) -> Self {
        MarketError::NetworkOrProvider(format!("ABI error: {}", err))
    }
}
