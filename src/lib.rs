//! # AFO Market SDK
//!
//! Client-side session and data-synchronization layer for the AFO marketplace
//! contract.
//!
//! ## Architecture
//!
//! The SDK is organized in layers:
//!
//! 1. **Core** — Shared newtypes, unit conversion, errors, outcome events
//! 2. **Provider** — `WalletProvider` (EIP-1193 style) + `HttpProvider` with retry policies
//! 3. **Contract** — `MarketContract` binding over the six marketplace methods
//! 4. **Session** — `SessionManager`: connect/disconnect, provider events, watchdog
//! 5. **Sync** — `TransactionCoordinator` + `ProductStore`
//! 6. **High-Level Client** — `MarketClient` wiring all of the above
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use afo_market_sdk::prelude::*;
//!
//! let client = MarketClient::builder()
//!     .contract_address("0x5FbDB2315678afecb367f032d93F642f64180aa3")
//!     .provider(Arc::new(HttpProvider::new("http://127.0.0.1:8545")))
//!     .build()?;
//!
//! let _running = client.start().await;
//! client.products().fetch_all().await?;
//! let products = client.products().all_products().await;
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes and unit conversion.
pub mod shared;

/// Unified SDK error types and the error-message normalizer.
pub mod error;

/// Structured outcome events for the notification surface.
pub mod events;

/// Network and timing defaults.
pub mod network;

/// Deployment configuration.
pub mod config;

// ── Layer 2: Provider ────────────────────────────────────────────────────────

/// Wallet provider abstraction, events and the JSON-RPC transport.
pub mod provider;

// ── Layer 3: Contract ────────────────────────────────────────────────────────

/// Marketplace contract binding.
pub mod contract;

// ── Layer 4: Session ─────────────────────────────────────────────────────────

/// Wallet session lifecycle.
pub mod session;

// ── Layer 5: Sync ────────────────────────────────────────────────────────────

/// Write submission with per-operation in-flight flags.
pub mod coordinator;

/// Domain modules (vertical slices).
pub mod domain;

// ── Layer 6: High-Level Client ───────────────────────────────────────────────

/// `MarketClient` — the primary entry point.
pub mod client;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::units::{format_ether, parse_ether, parse_ether_str};
    pub use crate::shared::{parse_address, ProductId};

    // Errors
    pub use crate::error::normalize::extract_error_message;
    pub use crate::error::{MarketError, RpcError};

    // Events
    pub use crate::events::{Notifier, OutcomeEvent, OutcomeKind};

    // Config
    pub use crate::config::{ConfirmationConfig, MarketConfig};

    // Provider
    #[cfg(feature = "http")]
    pub use crate::provider::http::HttpProvider;
    pub use crate::provider::retry::{RetryConfig, RetryPolicy};
    pub use crate::provider::{ProviderEvent, ProviderSlot, WalletProvider};

    // Contract
    pub use crate::contract::rpc::RpcMarketContract;
    pub use crate::contract::{ContractFactory, MarketContract, PendingTx, Signer, TxReceipt};

    // Session
    pub use crate::session::{ConnectionState, SessionListener, SessionManager, WalletSession};

    // Sync
    pub use crate::coordinator::{OperationFlags, OperationKey, TransactionCoordinator};
    pub use crate::domain::product::state::ProductCollection;
    pub use crate::domain::product::store::{FetchOutcome, ProductStore};
    pub use crate::domain::product::wire::ItemRecord;
    pub use crate::domain::product::{Product, ProductKey};

    // Client
    pub use crate::client::{MarketClient, MarketClientBuilder, Running};

    pub use ethers_core::types::{Address, H256, U256};
    pub use rust_decimal::Decimal;
    pub use std::sync::Arc;
}
