//! High-level client wiring the session manager to the product store.
//!
//! The client owns one [`SessionManager`] and one [`ProductStore`] sharing a
//! single [`Notifier`]. Background work (provider listener, auto-sync) only
//! runs while the [`Running`] handle returned by [`MarketClient::start`] is
//! alive.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::{parse_contract_address, ConfirmationConfig, MarketConfig};
use crate::contract::{rpc_factory, ContractFactory};
use crate::coordinator::TransactionCoordinator;
use crate::domain::product::store::ProductStore;
use crate::error::MarketError;
use crate::events::{Notifier, OutcomeEvent};
use crate::provider::{ProviderSlot, WalletProvider};
use crate::session::{ConnectionState, SessionListener, SessionManager, WalletSession};

/// The primary entry point for the SDK.
pub struct MarketClient {
    config: MarketConfig,
    session: Arc<SessionManager>,
    products: Arc<ProductStore>,
    notifier: Notifier,
}

impl MarketClient {
    pub fn builder() -> MarketClientBuilder {
        MarketClientBuilder::default()
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn products(&self) -> &Arc<ProductStore> {
        &self.products
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Subscribe to connect/disconnect/write outcome events.
    pub fn events(&self) -> broadcast::Receiver<OutcomeEvent> {
        self.notifier.subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Start the provider listener and auto-sync, then restore the session
    /// silently.
    pub async fn start(&self) -> Running {
        let sync = tokio::spawn(run_auto_sync(
            Arc::clone(&self.session),
            Arc::clone(&self.products),
        ));
        let listener = self.session.listen().await;
        self.session.auto_connect().await;
        Running {
            listener,
            sync: Some(sync),
        }
    }

    pub async fn connect(&self) -> Arc<WalletSession> {
        self.session.connect().await
    }

    /// Disconnect and drop every cached product.
    pub async fn disconnect(&self) {
        self.session.disconnect();
        self.products.reset().await;
    }
}

impl std::fmt::Debug for MarketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketClient")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Background tasks of a started client. Dropping it stops them.
pub struct Running {
    listener: Option<SessionListener>,
    sync: Option<JoinHandle<()>>,
}

impl Running {
    /// Whether this handle owns the provider listener. `false` when another
    /// listener was already running for the same session manager.
    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        if let Some(handle) = self.sync.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Running {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Running")
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

/// Refetch both collections once per newly connected session and drop them
/// once per disconnect, whoever initiated it.
async fn run_auto_sync(session: Arc<SessionManager>, products: Arc<ProductStore>) {
    let mut rx = session.subscribe();
    let mut handled: Option<u64> = None;
    loop {
        let snapshot = Arc::clone(&rx.borrow_and_update());
        let fresh = handled != Some(snapshot.generation);
        if fresh && snapshot.status == ConnectionState::Disconnected {
            handled = Some(snapshot.generation);
            tracing::debug!(generation = snapshot.generation, "session dropped, clearing products");
            products.reset().await;
        } else if fresh && snapshot.is_connected() {
            handled = Some(snapshot.generation);
            tracing::debug!(generation = snapshot.generation, "session connected, syncing products");
            if let Err(e) = products.fetch_all().await {
                tracing::warn!(error = %e, "auto-sync of all products failed");
            }
            if let Err(e) = products.fetch_owned().await {
                tracing::warn!(error = %e, "auto-sync of owned products failed");
            }
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct MarketClientBuilder {
    config: Option<MarketConfig>,
    contract_address: Option<String>,
    rpc_url: Option<String>,
    provider: Option<Arc<dyn WalletProvider>>,
    slot: Option<ProviderSlot>,
    factory: Option<ContractFactory>,
    watchdog_interval: Option<Duration>,
    confirmation: Option<ConfirmationConfig>,
}

impl MarketClientBuilder {
    /// Start from a resolved config, e.g. [`MarketConfig::from_env`].
    pub fn config(mut self, config: MarketConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Deployed contract address. Validated by [`build`](Self::build).
    pub fn contract_address(mut self, address: &str) -> Self {
        self.contract_address = Some(address.to_string());
        self
    }

    /// JSON-RPC endpoint for the default `HttpProvider`.
    pub fn rpc_url(mut self, url: &str) -> Self {
        self.rpc_url = Some(url.to_string());
        self
    }

    /// Install a wallet provider.
    pub fn provider(mut self, provider: Arc<dyn WalletProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Share an existing provider slot. Takes precedence over
    /// [`provider`](Self::provider); an empty slot means "no wallet yet".
    pub fn slot(mut self, slot: ProviderSlot) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Replace how contract bindings are built.
    pub fn contract_factory(mut self, factory: ContractFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = Some(interval);
        self
    }

    pub fn confirmation(mut self, confirmation: ConfirmationConfig) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    pub fn build(self) -> Result<MarketClient, MarketError> {
        let mut config = match (self.config, self.contract_address) {
            (Some(mut config), Some(raw)) => {
                config.contract_address = parse_contract_address(&raw)?;
                config
            }
            (Some(config), None) => config,
            (None, Some(raw)) => MarketConfig::new(parse_contract_address(&raw)?),
            (None, None) => {
                return Err(MarketError::Config(
                    "contract address is required".to_string(),
                ))
            }
        };
        if let Some(url) = self.rpc_url {
            config.rpc_url = url;
        }
        if let Some(interval) = self.watchdog_interval {
            config.watchdog_interval = interval;
        }
        if let Some(confirmation) = self.confirmation {
            config.confirmation = confirmation;
        }

        let slot = match (self.slot, self.provider) {
            (Some(slot), _) => slot,
            (None, Some(provider)) => ProviderSlot::with_provider(provider),
            (None, None) => default_slot(&config),
        };
        let factory = self
            .factory
            .unwrap_or_else(|| rpc_factory(config.confirmation));

        let notifier = Notifier::new();
        let session = Arc::new(SessionManager::new(
            slot,
            factory,
            &config,
            notifier.clone(),
        ));
        let products = Arc::new(ProductStore::new(
            Arc::clone(&session),
            TransactionCoordinator::default(),
            notifier.clone(),
        ));

        Ok(MarketClient {
            config,
            session,
            products,
            notifier,
        })
    }
}

#[cfg(feature = "http")]
fn default_slot(config: &MarketConfig) -> ProviderSlot {
    ProviderSlot::with_provider(Arc::new(crate::provider::http::HttpProvider::new(
        &config.rpc_url,
    )))
}

#[cfg(not(feature = "http"))]
fn default_slot(_config: &MarketConfig) -> ProviderSlot {
    ProviderSlot::new()
}
