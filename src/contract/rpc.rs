//! JSON-RPC backed [`MarketContract`].
//!
//! Reads go through `eth_call` against the latest block. Writes go through
//! `eth_sendTransaction`, so the provider must hold (or prompt for) the
//! signer's key. Confirmation polls `eth_getTransactionReceipt`.

use std::sync::Arc;

use async_trait::async_trait;
use ethers_core::types::{Address, Bytes, H256, U256, U64};
use serde_json::{json, Value};

use super::{abi, MarketContract, PendingTx, Signer, TxReceipt};
use crate::config::ConfirmationConfig;
use crate::domain::product::wire::ItemRecord;
use crate::error::MarketError;
use crate::provider::{decode, WalletProvider};
use crate::shared::ProductId;

pub struct RpcMarketContract {
    signer: Signer,
    address: Address,
    confirmation: ConfirmationConfig,
}

impl RpcMarketContract {
    pub fn new(signer: Signer, address: Address, confirmation: ConfirmationConfig) -> Self {
        Self {
            signer,
            address,
            confirmation,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    async fn call(&self, data: Vec<u8>) -> Result<Vec<u8>, MarketError> {
        let params = json!([
            {
                "from": self.signer.address(),
                "to": self.address,
                "data": Bytes::from(data),
            },
            "latest"
        ]);
        let value = self.signer.provider().request("eth_call", params).await?;
        let bytes: Bytes = decode(value)?;
        Ok(bytes.to_vec())
    }

    async fn send(&self, data: Vec<u8>, value_wei: U256) -> Result<PendingTx, MarketError> {
        let mut tx = json!({
            "from": self.signer.address(),
            "to": self.address,
            "data": Bytes::from(data),
        });
        if !value_wei.is_zero() {
            tx["value"] = json!(value_wei);
        }
        let provider = Arc::clone(self.signer.provider());
        let result = provider.request("eth_sendTransaction", json!([tx])).await?;
        let hash: H256 = decode(result)?;
        tracing::debug!(hash = ?hash, "transaction submitted");

        let confirmation = self.confirmation;
        Ok(PendingTx::new(
            hash,
            wait_for_receipt(provider, hash, confirmation),
        ))
    }
}

/// Poll until the receipt shows up, then check its status.
async fn wait_for_receipt(
    provider: Arc<dyn WalletProvider>,
    hash: H256,
    config: ConfirmationConfig,
) -> Result<TxReceipt, MarketError> {
    for attempt in 0..config.max_attempts.max(1) {
        let value = provider
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if let Some(receipt) = parse_receipt(hash, &value)? {
            return Ok(receipt);
        }
        tracing::trace!(hash = ?hash, attempt, "receipt not available yet");
        tokio::time::sleep(config.poll_interval).await;
    }
    Err(MarketError::NetworkOrProvider(format!(
        "Transaction {:?} was not confirmed after {} attempts",
        hash, config.max_attempts
    )))
}

fn parse_receipt(hash: H256, value: &Value) -> Result<Option<TxReceipt>, MarketError> {
    if value.is_null() {
        return Ok(None);
    }
    let block_number = match value.get("blockNumber") {
        Some(Value::Null) | None => return Ok(None),
        Some(raw) => Some(serde_json::from_value::<U64>(raw.clone())?.as_u64()),
    };
    let status = value
        .get("status")
        .cloned()
        .map(serde_json::from_value::<U64>)
        .transpose()?;
    if status == Some(U64::zero()) {
        return Err(MarketError::TransactionReverted(format!(
            "Transaction {:?} reverted",
            hash
        )));
    }
    Ok(Some(TxReceipt { hash, block_number }))
}

#[async_trait]
impl MarketContract for RpcMarketContract {
    async fn item_count(&self) -> Result<u64, MarketError> {
        let out = self.call(abi::item_count_call()?).await?;
        abi::decode_item_count(&out)
    }

    async fn item(&self, id: ProductId) -> Result<ItemRecord, MarketError> {
        let out = self.call(abi::item_call(id)?).await?;
        abi::decode_item(id, &out)
    }

    async fn items_by_owner(&self, owner: Address) -> Result<Vec<ProductId>, MarketError> {
        let out = self.call(abi::items_by_owner_call(owner)?).await?;
        abi::decode_item_ids(&out)
    }

    async fn list_item(&self, name: &str, price_wei: U256) -> Result<PendingTx, MarketError> {
        self.send(abi::list_items_call(name, price_wei)?, U256::zero())
            .await
    }

    async fn purchase_item(
        &self,
        id: ProductId,
        value_wei: U256,
    ) -> Result<PendingTx, MarketError> {
        self.send(abi::purchase_item_call(id)?, value_wei).await
    }

    async fn transfer_item(
        &self,
        id: ProductId,
        new_owner: Address,
    ) -> Result<PendingTx, MarketError> {
        self.send(abi::transfer_item_call(id, new_owner)?, U256::zero())
            .await
    }
}
