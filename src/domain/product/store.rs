//! Product store: cached reads plus write-then-reconcile.
//!
//! The store owns both collections and the last failure message. Every
//! fetch captures the session generation it was issued against and commits
//! only if that session is still live, so results computed for a replaced
//! account or network never reach the cache.

use std::sync::Arc;

use async_lock::RwLock;
use ethers_core::types::{Address, U256};
use futures_util::future::try_join_all;
use rust_decimal::Decimal;

use super::state::ProductCollection;
use super::Product;
use crate::contract::{MarketContract, TxReceipt};
use crate::coordinator::{OperationFlags, OperationKey, TransactionCoordinator};
use crate::error::MarketError;
use crate::events::Notifier;
use crate::session::SessionManager;
use crate::shared::units::parse_ether;
use crate::shared::{parse_address, ProductId};

/// What a fetch did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The collection was replaced.
    Updated,
    /// A fetch under the same key was already running; nothing was read.
    Skipped,
    /// The session changed while reading; the result was thrown away.
    Stale,
}

#[derive(Debug, Default)]
struct StoreState {
    all: ProductCollection,
    owned: ProductCollection,
    last_error: Option<String>,
}

pub struct ProductStore {
    session: Arc<SessionManager>,
    coordinator: TransactionCoordinator,
    notifier: Notifier,
    state: RwLock<StoreState>,
}

impl ProductStore {
    pub fn new(
        session: Arc<SessionManager>,
        coordinator: TransactionCoordinator,
        notifier: Notifier,
    ) -> Self {
        Self {
            session,
            coordinator,
            notifier,
            state: RwLock::new(StoreState::default()),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Every listed item, newest first.
    pub async fn all_products(&self) -> Vec<Product> {
        self.state.read().await.all.to_vec()
    }

    /// Items owned by the session account, newest first.
    pub async fn owned_products(&self) -> Vec<Product> {
        self.state.read().await.owned.to_vec()
    }

    pub async fn product(&self, id: ProductId) -> Option<Product> {
        self.state.read().await.all.get(id).cloned()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    pub fn in_flight(&self, key: OperationKey) -> bool {
        self.flags().is_in_flight(key)
    }

    pub fn flags(&self) -> &OperationFlags {
        self.coordinator.flags()
    }

    /// Forget everything. Used on explicit disconnect.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.all.clear();
        state.owned.clear();
        state.last_error = None;
    }

    // ── Fetches ──────────────────────────────────────────────────────────

    /// Reload every listed item.
    pub async fn fetch_all(&self) -> Result<FetchOutcome, MarketError> {
        let Some(_guard) = self.flags().try_acquire(OperationKey::Products) else {
            tracing::debug!("product fetch already in flight, skipping");
            return Ok(FetchOutcome::Skipped);
        };
        let session = self.session.current();
        let (_, contract) = match session.require_ready() {
            Ok(ready) => ready,
            Err(err) => return Err(self.record_error(err).await),
        };
        self.clear_error().await;

        let result = read_all(contract.as_ref()).await;
        self.commit(OperationKey::Products, session.generation, result, |state, products| {
            state.all.replace_from_ascending(products)
        })
        .await
    }

    /// Reload the items owned by the session account.
    pub async fn fetch_owned(&self) -> Result<FetchOutcome, MarketError> {
        let Some(_guard) = self.flags().try_acquire(OperationKey::MyProducts) else {
            tracing::debug!("owned product fetch already in flight, skipping");
            return Ok(FetchOutcome::Skipped);
        };
        let session = self.session.current();
        let (owner, contract) = match session.require_ready() {
            Ok(ready) => ready,
            Err(err) => return Err(self.record_error(err).await),
        };
        self.clear_error().await;

        let result = read_owned(contract.as_ref(), owner).await;
        self.commit(OperationKey::MyProducts, session.generation, result, |state, products| {
            state.owned.replace_from_ascending(products)
        })
        .await
    }

    /// Refetch both collections after a confirmed write.
    async fn refresh(&self) {
        if let Err(e) = self.fetch_all().await {
            tracing::warn!(error = %e, "refresh of all products failed");
        }
        if let Err(e) = self.fetch_owned().await {
            tracing::warn!(error = %e, "refresh of owned products failed");
        }
    }

    async fn commit(
        &self,
        key: OperationKey,
        generation: u64,
        result: Result<Vec<Product>, MarketError>,
        apply: impl FnOnce(&mut StoreState, Vec<Product>),
    ) -> Result<FetchOutcome, MarketError> {
        let mut state = self.state.write().await;
        if self.session.current().generation != generation {
            tracing::debug!(%key, "session replaced during fetch, discarding result");
            return Ok(FetchOutcome::Stale);
        }
        match result {
            Ok(products) => {
                tracing::debug!(%key, count = products.len(), "products updated");
                apply(&mut state, products);
                Ok(FetchOutcome::Updated)
            }
            Err(err) => {
                tracing::warn!(%key, error = %err, "product fetch failed");
                state.last_error = Some(err.message());
                Err(err)
            }
        }
    }

    async fn record_error(&self, err: MarketError) -> MarketError {
        self.state.write().await.last_error = Some(err.message());
        err
    }

    async fn clear_error(&self) {
        self.state.write().await.last_error = None;
    }

    // ── Writes ───────────────────────────────────────────────────────────

    /// List a new product priced in ether.
    ///
    /// On confirmation an unconfirmed entry is put at the front of the list
    /// and `on_success` runs once. The entry is replaced by the real one on
    /// the next full fetch.
    pub async fn add_product(
        &self,
        name: &str,
        price_ether: Decimal,
        on_success: impl FnOnce(),
    ) -> Result<TxReceipt, MarketError> {
        let name = name.trim();
        let price_wei = validate_listing(name, price_ether)?;
        let session = self.session.current();
        let (owner, contract) = session.require_ready()?;
        let contract = contract.as_ref();
        let generation = session.generation;

        let result = self
            .coordinator
            .perform(
                OperationKey::Add,
                move || async move {
                    self.clear_error().await;
                    contract.list_item(name, price_wei).await
                },
                move |_| async move {
                    self.insert_placeholder(generation, name, price_wei, owner)
                        .await;
                    on_success();
                },
            )
            .await;

        self.finish(
            result,
            "Product Added",
            "Your product has been successfully listed.",
        )
        .await
    }

    async fn insert_placeholder(&self, generation: u64, name: &str, price_wei: U256, owner: Address) {
        let mut state = self.state.write().await;
        if self.session.current().generation != generation {
            tracing::debug!("session replaced before listing confirmed, not caching it");
            return;
        }
        let index = state.all.len() as u64;
        state
            .all
            .prepend(Product::placeholder(index, name, price_wei, owner));
    }

    /// Buy a product at its current on-chain price.
    pub async fn purchase_product(&self, id: ProductId) -> Result<TxReceipt, MarketError> {
        let session = self.session.current();
        let (_, contract) = session.require_ready()?;
        let contract = contract.as_ref();

        let result = self
            .coordinator
            .perform(
                OperationKey::Purchase(id),
                move || async move {
                    self.clear_error().await;
                    let item = contract.item(id).await?;
                    contract.purchase_item(id, item.price).await
                },
                move |_| self.refresh(),
            )
            .await;

        self.finish(
            result,
            "Product Purchased",
            "You have successfully purchased the product.",
        )
        .await
    }

    /// Hand a product to another account.
    pub async fn transfer_ownership(
        &self,
        id: ProductId,
        new_owner: &str,
    ) -> Result<TxReceipt, MarketError> {
        let new_owner = parse_address(new_owner)?;
        let session = self.session.current();
        let (_, contract) = session.require_ready()?;
        let contract = contract.as_ref();

        let result = self
            .coordinator
            .perform(
                OperationKey::Transfer(id),
                move || async move {
                    self.clear_error().await;
                    contract.transfer_item(id, new_owner).await
                },
                move |_| self.refresh(),
            )
            .await;

        self.finish(
            result,
            "Ownership Transferred",
            "The product now belongs to its new owner.",
        )
        .await
    }

    async fn finish(
        &self,
        result: Result<TxReceipt, MarketError>,
        title: &str,
        message: &str,
    ) -> Result<TxReceipt, MarketError> {
        match &result {
            Ok(receipt) => {
                tracing::info!(hash = ?receipt.hash, title, "transaction confirmed");
                self.notifier.success(title, message);
            }
            Err(MarketError::Busy(key)) => {
                tracing::debug!(%key, "write rejected, already in flight");
            }
            Err(err) => {
                tracing::warn!(error = %err, title, "transaction failed");
                self.state.write().await.last_error = Some(err.message());
                self.notifier.failure("Error", &err.message());
            }
        }
        result
    }
}

impl std::fmt::Debug for ProductStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductStore")
            .field("in_flight", &self.flags().snapshot())
            .finish_non_exhaustive()
    }
}

/// Check an add-product form and convert the price to wei.
fn validate_listing(name: &str, price_ether: Decimal) -> Result<U256, MarketError> {
    if name.is_empty() {
        return Err(MarketError::Validation("Product name is required.".into()));
    }
    if price_ether <= Decimal::ZERO {
        return Err(MarketError::Validation(
            "Price must be a positive number.".into(),
        ));
    }
    parse_ether(price_ether).map_err(|e| MarketError::Validation(e.to_string()))
}

async fn read_all(contract: &dyn MarketContract) -> Result<Vec<Product>, MarketError> {
    let count = contract.item_count().await?;
    // The count comes from the chain; do not size anything from it.
    let mut products = Vec::new();
    for id in 1..=count {
        products.push(Product::from(contract.item(ProductId::new(id)).await?));
    }
    Ok(products)
}

async fn read_owned(
    contract: &dyn MarketContract,
    owner: Address,
) -> Result<Vec<Product>, MarketError> {
    let ids = contract.items_by_owner(owner).await?;
    let records = try_join_all(ids.into_iter().map(|id| contract.item(id))).await?;
    Ok(records
        .into_iter()
        .filter(|record| !record.name.is_empty())
        .map(Product::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_validate_listing() {
        let wei = validate_listing("Widget", Decimal::from_str("1.5").unwrap()).unwrap();
        assert_eq!(wei, U256::from(1_500_000_000_000_000_000u64));

        assert!(matches!(
            validate_listing("", Decimal::ONE),
            Err(MarketError::Validation(_))
        ));
        assert!(matches!(
            validate_listing("Widget", Decimal::ZERO),
            Err(MarketError::Validation(_))
        ));
        assert!(matches!(
            validate_listing("Widget", Decimal::from_str("-2").unwrap()),
            Err(MarketError::Validation(_))
        ));
    }
}
