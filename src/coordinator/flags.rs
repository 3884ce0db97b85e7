//! In-flight operation flags.

use std::fmt;
use std::sync::Arc;

use dashmap::DashSet;

use crate::shared::ProductId;

/// What an in-flight operation is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKey {
    Products,
    MyProducts,
    Add,
    Purchase(ProductId),
    Transfer(ProductId),
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKey::Products => write!(f, "products"),
            OperationKey::MyProducts => write!(f, "myProducts"),
            OperationKey::Add => write!(f, "add"),
            OperationKey::Purchase(id) => write!(f, "purchase:{}", id),
            OperationKey::Transfer(id) => write!(f, "transfer:{}", id),
        }
    }
}

/// Shared set of in-flight keys. Cloning shares the set.
#[derive(Debug, Clone, Default)]
pub struct OperationFlags {
    inner: Arc<DashSet<OperationKey>>,
}

impl OperationFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` in flight. `None` if it already is.
    pub fn try_acquire(&self, key: OperationKey) -> Option<FlagGuard> {
        if self.inner.insert(key) {
            Some(FlagGuard {
                flags: Arc::clone(&self.inner),
                key,
            })
        } else {
            None
        }
    }

    pub fn is_in_flight(&self, key: OperationKey) -> bool {
        self.inner.contains(&key)
    }

    pub fn snapshot(&self) -> Vec<OperationKey> {
        self.inner.iter().map(|k| *k).collect()
    }
}

/// Holds a key in flight until dropped.
#[derive(Debug)]
pub struct FlagGuard {
    flags: Arc<DashSet<OperationKey>>,
    key: OperationKey,
}

impl FlagGuard {
    pub fn key(&self) -> OperationKey {
        self.key
    }
}

impl Drop for FlagGuard {
    fn drop(&mut self) {
        self.flags.remove(&self.key);
    }
}
