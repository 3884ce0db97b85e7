//! Wallet session lifecycle.
//!
//! [`SessionManager`] owns the single live [`WalletSession`]. Sessions are
//! immutable snapshots published on a `watch` channel: every account,
//! network or provider change publishes a new one with a higher
//! `generation`, and consumers compare generations to detect that work they
//! started has been overtaken.

mod listener;

pub use listener::SessionListener;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ethers_core::types::Address;
use tokio::sync::watch;

use crate::config::MarketConfig;
use crate::contract::{ContractFactory, MarketContract, Signer};
use crate::error::MarketError;
use crate::events::Notifier;
use crate::provider::{ProviderEvent, ProviderSlot, WalletProvider};
use crate::shared::checksum;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

// ─── WalletSession ───────────────────────────────────────────────────────────

/// One snapshot of the wallet connection.
#[derive(Clone)]
pub struct WalletSession {
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
    pub status: ConnectionState,
    pub contract: Option<Arc<dyn MarketContract>>,
    /// Bumped on every replacement.
    pub generation: u64,
    /// Reverse-resolved name, or the checksummed address.
    pub display_name: Option<String>,
    /// Why the last connect attempt failed. Kept until the next attempt.
    pub error: Option<MarketError>,
}

impl WalletSession {
    fn disconnected(generation: u64) -> Self {
        Self {
            address: None,
            chain_id: None,
            status: ConnectionState::Disconnected,
            contract: None,
            generation,
            display_name: None,
            error: None,
        }
    }

    fn with_status(generation: u64, status: ConnectionState, error: Option<MarketError>) -> Self {
        Self {
            status,
            error,
            ..Self::disconnected(generation)
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionState::Connected
    }

    /// The account and contract handle, or [`MarketError::NotConnected`] if
    /// either is missing.
    pub fn require_ready(&self) -> Result<(Address, Arc<dyn MarketContract>), MarketError> {
        match (self.address, &self.contract) {
            (Some(address), Some(contract)) => Ok((address, Arc::clone(contract))),
            _ => Err(MarketError::NotConnected),
        }
    }
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSession")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("status", &self.status)
            .field("has_contract", &self.contract.is_some())
            .field("generation", &self.generation)
            .field("display_name", &self.display_name)
            .field("error", &self.error)
            .finish()
    }
}

// ─── SessionManager ──────────────────────────────────────────────────────────

pub struct SessionManager {
    slot: ProviderSlot,
    factory: ContractFactory,
    contract_address: Address,
    watchdog_interval: Duration,
    notifier: Notifier,
    tx: watch::Sender<Arc<WalletSession>>,
    connecting: AtomicBool,
    listening: AtomicBool,
}

struct Connected {
    address: Address,
    chain_id: u64,
    display_name: String,
    contract: Arc<dyn MarketContract>,
}

/// Clears the connect flag on every exit path.
struct ConnectGuard<'a>(&'a AtomicBool);

impl<'a> ConnectGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ConnectGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionManager {
    pub fn new(
        slot: ProviderSlot,
        factory: ContractFactory,
        config: &MarketConfig,
        notifier: Notifier,
    ) -> Self {
        let (tx, _) = watch::channel(Arc::new(WalletSession::disconnected(0)));
        Self {
            slot,
            factory,
            contract_address: config.contract_address,
            watchdog_interval: config.watchdog_interval,
            notifier,
            tx,
            connecting: AtomicBool::new(false),
            listening: AtomicBool::new(false),
        }
    }

    /// The live session snapshot.
    pub fn current(&self) -> Arc<WalletSession> {
        Arc::clone(&self.tx.borrow())
    }

    /// Receive every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<WalletSession>> {
        self.tx.subscribe()
    }

    pub fn slot(&self) -> &ProviderSlot {
        &self.slot
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::Acquire)
    }

    /// Connect and announce the result.
    ///
    /// Returns the current snapshot untouched when a connect is already in
    /// flight. Failures are reported through the returned session's `error`
    /// and an outcome event, not as `Err`.
    pub async fn connect(&self) -> Arc<WalletSession> {
        self.connect_inner(true).await
    }

    /// Connect at startup. Only failures are announced.
    pub async fn auto_connect(&self) -> Arc<WalletSession> {
        self.connect_inner(false).await
    }

    async fn connect_inner(&self, announce: bool) -> Arc<WalletSession> {
        let Some(_guard) = ConnectGuard::acquire(&self.connecting) else {
            tracing::debug!("connect already in flight, ignoring");
            return self.current();
        };

        let Some(provider) = self.slot.current().await else {
            tracing::info!("no wallet provider installed");
            let session = self.publish(|generation| {
                WalletSession::with_status(
                    generation,
                    ConnectionState::Error,
                    Some(MarketError::NoProvider),
                )
            });
            self.notifier.failure(
                "No Wallet Found",
                "Please install a wallet extension to use the marketplace.",
            );
            return session;
        };

        self.publish(|generation| {
            WalletSession::with_status(generation, ConnectionState::Connecting, None)
        });

        match self.establish(provider).await {
            Ok(connected) => {
                tracing::info!(
                    address = ?connected.address,
                    chain_id = connected.chain_id,
                    "wallet connected"
                );
                let message = format!("Connected as {}", connected.display_name);
                let session = self.publish(|generation| WalletSession {
                    address: Some(connected.address),
                    chain_id: Some(connected.chain_id),
                    status: ConnectionState::Connected,
                    contract: Some(connected.contract),
                    generation,
                    display_name: Some(connected.display_name),
                    error: None,
                });
                if announce {
                    self.notifier.success("Wallet Connected", &message);
                }
                session
            }
            Err(err) => {
                tracing::warn!(error = %err, "wallet connection failed");
                self.publish(|generation| {
                    WalletSession::with_status(
                        generation,
                        ConnectionState::Error,
                        Some(err.clone()),
                    )
                });
                let session = self.publish(|generation| {
                    WalletSession::with_status(
                        generation,
                        ConnectionState::Disconnected,
                        Some(err.clone()),
                    )
                });
                self.notifier.failure("Connection Failed", &err.message());
                session
            }
        }
    }

    async fn establish(&self, provider: Arc<dyn WalletProvider>) -> Result<Connected, MarketError> {
        let accounts = provider.request_accounts().await?;
        let address = *accounts.first().ok_or_else(|| {
            MarketError::NetworkOrProvider("Wallet returned no accounts".to_string())
        })?;
        let chain_id = provider.chain_id().await?;

        let display_name = match provider.lookup_address(address).await {
            Ok(Some(name)) if !name.is_empty() => name,
            Ok(_) => checksum(&address),
            Err(e) => {
                tracing::debug!(error = %e, "name lookup failed, using address");
                checksum(&address)
            }
        };

        let signer = Signer::new(provider, address, chain_id);
        let contract = (self.factory)(signer, self.contract_address);
        Ok(Connected {
            address,
            chain_id,
            display_name,
            contract,
        })
    }

    /// Drop the session. A second call is a no-op.
    pub fn disconnect(&self) {
        let current = self.current();
        if current.status == ConnectionState::Disconnected && current.address.is_none() {
            return;
        }
        self.publish(WalletSession::disconnected);
        tracing::info!("wallet disconnected");
        self.notifier
            .warning("Wallet Disconnected", "You have disconnected your wallet.");
    }

    /// Route a provider notification.
    pub async fn handle_event(&self, event: ProviderEvent) {
        tracing::debug!(?event, "provider event");
        match event {
            ProviderEvent::AccountsChanged(accounts) if accounts.is_empty() => self.disconnect(),
            ProviderEvent::Disconnect => self.disconnect(),
            ProviderEvent::AccountsChanged(_)
            | ProviderEvent::ChainChanged(_)
            | ProviderEvent::ProviderChanged => {
                self.connect().await;
            }
        }
    }

    /// Start the provider listener and watchdog.
    ///
    /// `None` if this manager already has a running listener.
    pub async fn listen(self: &Arc<Self>) -> Option<SessionListener> {
        if self.listening.swap(true, Ordering::AcqRel) {
            tracing::debug!("session listener already running");
            return None;
        }
        Some(SessionListener::spawn(Arc::clone(self)).await)
    }

    pub(crate) fn watchdog_interval(&self) -> Duration {
        self.watchdog_interval
    }

    pub(crate) fn release_listener(&self) {
        self.listening.store(false, Ordering::Release);
    }

    /// Replace the session, bumping the generation.
    fn publish(&self, build: impl FnOnce(u64) -> WalletSession) -> Arc<WalletSession> {
        let mut published = self.current();
        self.tx.send_modify(|current| {
            *current = Arc::new(build(current.generation + 1));
            published = Arc::clone(current);
        });
        published
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("contract_address", &self.contract_address)
            .field("session", &self.current())
            .finish_non_exhaustive()
    }
}
