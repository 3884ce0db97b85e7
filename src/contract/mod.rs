//! Marketplace contract binding.
//!
//! [`MarketContract`] is the typed surface over the six contract methods the
//! SDK needs. Reads return decoded values; writes return a [`PendingTx`] that
//! must be awaited before the effect is treated as durable.
//!
//! The binding is always created for one [`Signer`], i.e. an account on one
//! provider instance on one network. Account or network changes never patch
//! an existing binding: the session layer builds a new one.

pub mod abi;
pub mod rpc;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use ethers_core::types::{Address, H256, U256};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::domain::product::wire::ItemRecord;
use crate::error::MarketError;
use crate::provider::WalletProvider;
use crate::shared::ProductId;

/// Typed contract surface. All methods need a live, connected session.
#[async_trait]
pub trait MarketContract: Send + Sync {
    /// Number of listed items. Ids run `1..=item_count`.
    async fn item_count(&self) -> Result<u64, MarketError>;

    /// One item by its 1-based id.
    async fn item(&self, id: ProductId) -> Result<ItemRecord, MarketError>;

    /// Ids of the items `owner` holds. Each must be resolved via [`item`].
    ///
    /// [`item`]: MarketContract::item
    async fn items_by_owner(&self, owner: Address) -> Result<Vec<ProductId>, MarketError>;

    /// List a new item for sale.
    async fn list_item(&self, name: &str, price_wei: U256) -> Result<PendingTx, MarketError>;

    /// Buy an item. `value_wei` must equal the current on-chain price.
    async fn purchase_item(&self, id: ProductId, value_wei: U256)
        -> Result<PendingTx, MarketError>;

    /// Hand an owned item to another account.
    async fn transfer_item(
        &self,
        id: ProductId,
        new_owner: Address,
    ) -> Result<PendingTx, MarketError>;
}

/// Builds the contract binding for a freshly connected signer.
pub type ContractFactory =
    Arc<dyn Fn(Signer, Address) -> Arc<dyn MarketContract> + Send + Sync>;

/// The default factory: [`rpc::RpcMarketContract`] over the signer's provider.
pub fn rpc_factory(confirmation: crate::config::ConfirmationConfig) -> ContractFactory {
    Arc::new(move |signer: Signer, address: Address| {
        Arc::new(rpc::RpcMarketContract::new(signer, address, confirmation)) as Arc<dyn MarketContract>
    })
}

// ─── Signer ──────────────────────────────────────────────────────────────────

/// An authorized account bound to the provider instance that authorized it.
#[derive(Clone)]
pub struct Signer {
    provider: Arc<dyn WalletProvider>,
    address: Address,
    chain_id: u64,
}

impl Signer {
    pub fn new(provider: Arc<dyn WalletProvider>, address: Address, chain_id: u64) -> Self {
        Self {
            provider,
            address,
            chain_id,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.provider
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

// ─── Pending transactions ────────────────────────────────────────────────────

/// Receipt of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: H256,
    pub block_number: Option<u64>,
}

/// A submitted, not yet confirmed write.
pub struct PendingTx {
    hash: H256,
    confirmation: BoxFuture<'static, Result<TxReceipt, MarketError>>,
}

impl PendingTx {
    pub fn new<F>(hash: H256, confirmation: F) -> Self
    where
        F: Future<Output = Result<TxReceipt, MarketError>> + Send + 'static,
    {
        Self {
            hash,
            confirmation: confirmation.boxed(),
        }
    }

    /// A transaction that is already final (e.g. instant-mining dev chains).
    pub fn confirmed(hash: H256) -> Self {
        Self::new(hash, async move {
            Ok(TxReceipt {
                hash,
                block_number: None,
            })
        })
    }

    pub fn hash(&self) -> H256 {
        self.hash
    }

    /// Wait until the chain confirms (or rejects) the transaction.
    pub async fn wait(self) -> Result<TxReceipt, MarketError> {
        self.confirmation.await
    }
}

impl std::fmt::Debug for PendingTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTx")
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}
