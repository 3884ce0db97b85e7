//! Write coordination.
//!
//! Every state-changing contract call goes through
//! [`TransactionCoordinator::perform`], which owns the in-flight flag for the
//! whole submit → confirm → reconcile sequence.

mod flags;

pub use flags::{FlagGuard, OperationFlags, OperationKey};

use std::future::Future;

use crate::contract::{PendingTx, TxReceipt};
use crate::error::MarketError;

#[derive(Debug, Clone, Default)]
pub struct TransactionCoordinator {
    flags: OperationFlags,
}

impl TransactionCoordinator {
    pub fn new(flags: OperationFlags) -> Self {
        Self { flags }
    }

    pub fn flags(&self) -> &OperationFlags {
        &self.flags
    }

    /// Submit a write under `key` and reconcile once it is confirmed.
    ///
    /// Fails with [`MarketError::Busy`] before calling `submit` when `key` is
    /// already in flight. `reconcile` only runs after confirmation.
    pub async fn perform<S, SFut, R, RFut>(
        &self,
        key: OperationKey,
        submit: S,
        reconcile: R,
    ) -> Result<TxReceipt, MarketError>
    where
        S: FnOnce() -> SFut,
        SFut: Future<Output = Result<PendingTx, MarketError>>,
        R: FnOnce(TxReceipt) -> RFut,
        RFut: Future<Output = ()>,
    {
        let _guard = self.flags.try_acquire(key).ok_or_else(|| {
            tracing::debug!(%key, "operation already in flight");
            MarketError::Busy(key)
        })?;

        let pending = submit().await?;
        tracing::debug!(%key, hash = ?pending.hash(), "awaiting confirmation");
        let receipt = pending.wait().await?;
        reconcile(receipt.clone()).await;
        Ok(receipt)
    }
}
