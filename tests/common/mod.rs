//! In-memory wallet and chain used by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Notify};

use afo_market_sdk::prelude::*;

pub const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

pub fn bob() -> Address {
    Address::repeat_byte(0xb0)
}

pub fn ether(n: u64) -> U256 {
    U256::exp10(18) * U256::from(n)
}

/// Poll `check` until it holds, failing the test after [`TEST_TIMEOUT`].
pub async fn eventually<F>(mut check: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(TEST_TIMEOUT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Await `fut`, failing the test after [`TEST_TIMEOUT`].
pub async fn within<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(TEST_TIMEOUT, fut)
        .await
        .expect("timed out")
}

// ─── FakeWallet ──────────────────────────────────────────────────────────────

pub struct FakeWallet {
    accounts: Mutex<Vec<Address>>,
    chain_id: AtomicU64,
    reject: AtomicBool,
    account_requests: AtomicUsize,
    connect_gate: Mutex<Option<Arc<Notify>>>,
    names: Mutex<HashMap<Address, String>>,
    events: broadcast::Sender<ProviderEvent>,
}

impl FakeWallet {
    pub fn new(account: Address) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            accounts: Mutex::new(vec![account]),
            chain_id: AtomicU64::new(31337),
            reject: AtomicBool::new(false),
            account_requests: AtomicUsize::new(0),
            connect_gate: Mutex::new(None),
            names: Mutex::new(HashMap::new()),
            events,
        })
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.lock().unwrap() = accounts;
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
    }

    pub fn reject_requests(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn set_name(&self, address: Address, name: &str) {
        self.names.lock().unwrap().insert(address, name.to_string());
    }

    /// Hold every `eth_requestAccounts` until the returned gate is notified.
    pub fn gate_connect(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.connect_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn account_requests(&self) -> usize {
        self.account_requests.load(Ordering::SeqCst)
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn request(&self, method: &str, _params: Value) -> Result<Value, RpcError> {
        match method {
            "eth_requestAccounts" => {
                self.account_requests.fetch_add(1, Ordering::SeqCst);
                let gate = self.connect_gate.lock().unwrap().clone();
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                if self.reject.load(Ordering::SeqCst) {
                    return Err(RpcError::Rpc {
                        code: 4001,
                        message: "User rejected the request.".into(),
                        data: None,
                    });
                }
                Ok(json!(*self.accounts.lock().unwrap()))
            }
            "eth_accounts" => Ok(json!(*self.accounts.lock().unwrap())),
            "eth_chainId" => Ok(json!(format!(
                "{:#x}",
                self.chain_id.load(Ordering::SeqCst)
            ))),
            other => Err(RpcError::Rpc {
                code: -32601,
                message: format!("method not found: {}", other),
                data: None,
            }),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }

    async fn lookup_address(&self, address: Address) -> Result<Option<String>, RpcError> {
        Ok(self.names.lock().unwrap().get(&address).cloned())
    }
}

// ─── FakeChain ───────────────────────────────────────────────────────────────

/// Marketplace contract state shared by every binding the factory builds.
#[derive(Default)]
pub struct FakeChain {
    items: Mutex<Vec<ItemRecord>>,
    calls: Mutex<Vec<String>>,
    bindings: AtomicUsize,
    tx_count: AtomicU64,
    failing_item: Mutex<Option<u64>>,
    reported_count: Mutex<Option<u64>>,
    read_gate: Mutex<Option<Arc<Notify>>>,
    write_gate: Mutex<Option<Arc<Notify>>>,
    reject_writes: AtomicBool,
    revert_writes: AtomicBool,
}

impl FakeChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Contract factory binding every signer to this chain.
    pub fn factory(self: &Arc<Self>) -> ContractFactory {
        let chain = Arc::clone(self);
        Arc::new(move |signer: Signer, _address: Address| {
            chain.bindings.fetch_add(1, Ordering::SeqCst);
            Arc::new(FakeContract {
                chain: Arc::clone(&chain),
                sender: signer.address(),
            }) as Arc<dyn MarketContract>
        })
    }

    /// List an item directly, bypassing the SDK.
    pub fn seed(&self, name: &str, price: U256, owner: Address) -> ProductId {
        let mut items = self.items.lock().unwrap();
        let id = ProductId::new(items.len() as u64 + 1);
        items.push(ItemRecord {
            id,
            name: name.to_string(),
            price,
            owner,
            sold: false,
        });
        id
    }

    pub fn item(&self, id: u64) -> Option<ItemRecord> {
        self.items.lock().unwrap().get(id as usize - 1).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn bindings(&self) -> usize {
        self.bindings.load(Ordering::SeqCst)
    }

    pub fn fail_item(&self, id: Option<u64>) {
        *self.failing_item.lock().unwrap() = id;
    }

    /// Make `itemCount` answer `count` regardless of what is stored.
    pub fn report_count(&self, count: Option<u64>) {
        *self.reported_count.lock().unwrap() = count;
    }

    /// Hold the next `item_count` read until the gate is notified.
    pub fn gate_next_read(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.read_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Hold the next write's confirmation until the gate is notified.
    pub fn gate_next_write(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.write_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn revert_writes(&self, revert: bool) {
        self.revert_writes.store(revert, Ordering::SeqCst);
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn submit<F>(self: &Arc<Self>, effect: F) -> Result<PendingTx, MarketError>
    where
        F: FnOnce(&mut Vec<ItemRecord>) -> Result<(), MarketError> + Send + 'static,
    {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(MarketError::UserRejected(
                "User denied transaction signature.".into(),
            ));
        }
        let n = self.tx_count.fetch_add(1, Ordering::SeqCst) + 1;
        let hash = H256::from_low_u64_be(n);
        let gate = self.write_gate.lock().unwrap().take();
        let chain = Arc::clone(self);
        Ok(PendingTx::new(hash, async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if chain.revert_writes.load(Ordering::SeqCst) {
                return Err(MarketError::TransactionReverted(
                    "execution reverted".into(),
                ));
            }
            effect(&mut chain.items.lock().unwrap())?;
            Ok(TxReceipt {
                hash,
                block_number: Some(n),
            })
        }))
    }
}

struct FakeContract {
    chain: Arc<FakeChain>,
    sender: Address,
}

#[async_trait]
impl MarketContract for FakeContract {
    async fn item_count(&self) -> Result<u64, MarketError> {
        self.chain.log("itemCount".into());
        let gate = self.chain.read_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(count) = *self.chain.reported_count.lock().unwrap() {
            return Ok(count);
        }
        Ok(self.chain.items.lock().unwrap().len() as u64)
    }

    async fn item(&self, id: ProductId) -> Result<ItemRecord, MarketError> {
        self.chain.log(format!("item:{}", id));
        if *self.chain.failing_item.lock().unwrap() == Some(id.get()) {
            return Err(MarketError::NetworkOrProvider("node unavailable".into()));
        }
        let items = self.chain.items.lock().unwrap();
        // Unknown ids read as the zero-valued struct, like a Solidity mapping.
        Ok(items
            .get(id.get() as usize - 1)
            .cloned()
            .unwrap_or(ItemRecord {
                id,
                name: String::new(),
                price: U256::zero(),
                owner: Address::zero(),
                sold: false,
            }))
    }

    async fn items_by_owner(&self, owner: Address) -> Result<Vec<ProductId>, MarketError> {
        self.chain.log("itemsByOwner".into());
        Ok(self
            .chain
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.owner == owner)
            .map(|item| item.id)
            .collect())
    }

    async fn list_item(&self, name: &str, price_wei: U256) -> Result<PendingTx, MarketError> {
        self.chain.log("listItem".into());
        let name = name.to_string();
        let owner = self.sender;
        self.chain.submit(move |items| {
            let id = ProductId::new(items.len() as u64 + 1);
            items.push(ItemRecord {
                id,
                name,
                price: price_wei,
                owner,
                sold: false,
            });
            Ok(())
        })
    }

    async fn purchase_item(
        &self,
        id: ProductId,
        value_wei: U256,
    ) -> Result<PendingTx, MarketError> {
        self.chain.log(format!("purchase:{}", id));
        let buyer = self.sender;
        self.chain.submit(move |items| {
            let item = items
                .get_mut(id.get() as usize - 1)
                .ok_or_else(|| MarketError::TransactionReverted("Item does not exist".into()))?;
            if item.sold {
                return Err(MarketError::TransactionReverted("Item already sold".into()));
            }
            if item.price != value_wei {
                return Err(MarketError::TransactionReverted("Incorrect price".into()));
            }
            item.owner = buyer;
            item.sold = true;
            Ok(())
        })
    }

    async fn transfer_item(
        &self,
        id: ProductId,
        new_owner: Address,
    ) -> Result<PendingTx, MarketError> {
        self.chain.log(format!("transfer:{}", id));
        let sender = self.sender;
        self.chain.submit(move |items| {
            let item = items
                .get_mut(id.get() as usize - 1)
                .ok_or_else(|| MarketError::TransactionReverted("Item does not exist".into()))?;
            if item.owner != sender {
                return Err(MarketError::TransactionReverted("Not the owner".into()));
            }
            item.owner = new_owner;
            Ok(())
        })
    }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

pub struct Harness {
    pub wallet: Arc<FakeWallet>,
    pub chain: Arc<FakeChain>,
    pub client: MarketClient,
}

impl Harness {
    /// A client wired to a fake wallet for `account`, not yet connected.
    pub fn new(account: Address) -> Self {
        let wallet = FakeWallet::new(account);
        let chain = FakeChain::new();
        let client = MarketClient::builder()
            .contract_address(CONTRACT)
            .provider(wallet.clone())
            .contract_factory(chain.factory())
            .watchdog_interval(Duration::from_millis(20))
            .build()
            .unwrap();
        Self {
            wallet,
            chain,
            client,
        }
    }

    /// A client connected as `account`.
    pub async fn connected(account: Address) -> Self {
        let harness = Self::new(account);
        let session = harness.client.connect().await;
        assert!(session.is_connected(), "connect failed: {:?}", session);
        harness
    }

    pub fn store(&self) -> &Arc<ProductStore> {
        self.client.products()
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        self.client.session()
    }
}

/// Drain every outcome event received so far.
pub fn drain(rx: &mut broadcast::Receiver<OutcomeEvent>) -> Vec<OutcomeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
