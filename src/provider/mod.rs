//! Wallet provider layer: EIP-1193 style requests plus notifications.
//!
//! A [`WalletProvider`] is whatever injects accounts and signs on the user's
//! behalf: a browser wallet bridge, a local node with unlocked accounts, a
//! test double. The [`ProviderSlot`] is the place a provider gets installed
//! into; it may be empty (no wallet) and it may be swapped at runtime.

#[cfg(feature = "http")]
pub mod http;
pub mod retry;

use std::sync::Arc;

use async_lock::RwLock;
use async_trait::async_trait;
use ethers_core::types::{Address, U64};
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::error::RpcError;

/// Notifications a provider pushes to the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The authorized account list changed. Empty means the user locked or
    /// disconnected every account.
    AccountsChanged(Vec<Address>),
    /// The provider switched networks.
    ChainChanged(u64),
    /// The provider lost its connection.
    Disconnect,
    /// The provider instance itself was replaced.
    ProviderChanged,
}

/// EIP-1193 style provider.
///
/// `request` is the only required transport method; the typed helpers are
/// built on top of it.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Send a JSON-RPC request and return its `result`.
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// Subscribe to provider notifications.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;

    /// Ask the user to authorize accounts (`eth_requestAccounts`).
    async fn request_accounts(&self) -> Result<Vec<Address>, RpcError> {
        let value = self.request("eth_requestAccounts", json!([])).await?;
        decode(value)
    }

    /// Already-authorized accounts, without prompting (`eth_accounts`).
    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        let value = self.request("eth_accounts", json!([])).await?;
        decode(value)
    }

    /// Current network (`eth_chainId`).
    async fn chain_id(&self) -> Result<u64, RpcError> {
        let value = self.request("eth_chainId", json!([])).await?;
        decode::<U64>(value).map(|id| id.as_u64())
    }

    /// Reverse name lookup for an address. Providers without name
    /// resolution return `None`.
    async fn lookup_address(&self, _address: Address) -> Result<Option<String>, RpcError> {
        Ok(None)
    }
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|e| RpcError::InvalidResponse(e.to_string()))
}

// ─── ProviderSlot ────────────────────────────────────────────────────────────

/// The injection point for the active wallet provider.
///
/// Identity matters: the watchdog compares the installed instance by pointer
/// to detect a provider swap.
#[derive(Clone, Default)]
pub struct ProviderSlot {
    inner: Arc<RwLock<Option<Arc<dyn WalletProvider>>>>,
}

impl ProviderSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(provider))),
        }
    }

    /// Install (or replace) the provider.
    pub async fn install(&self, provider: Arc<dyn WalletProvider>) {
        *self.inner.write().await = Some(provider);
    }

    /// Remove the provider, returning it.
    pub async fn take(&self) -> Option<Arc<dyn WalletProvider>> {
        self.inner.write().await.take()
    }

    pub async fn current(&self) -> Option<Arc<dyn WalletProvider>> {
        self.inner.read().await.clone()
    }
}

impl std::fmt::Debug for ProviderSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSlot").finish_non_exhaustive()
    }
}

/// Whether two optional providers are the same instance.
pub fn same_provider(
    a: &Option<Arc<dyn WalletProvider>>,
    b: &Option<Arc<dyn WalletProvider>>,
) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
        (None, None) => true,
        _ => false,
    }
}
