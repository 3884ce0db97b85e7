//! Ordered product list owned by the store.

use super::Product;
use crate::shared::ProductId;

/// Newest-first list of products.
///
/// Fetched entries are ordered by descending contract id; optimistic entries
/// are prepended ahead of everything fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCollection {
    products: Vec<Product>,
}

impl ProductCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `fetched`, given in ascending id order.
    pub fn replace_from_ascending(&mut self, mut fetched: Vec<Product>) {
        fetched.reverse();
        self.products = fetched;
    }

    /// Put an optimistic entry at the front.
    pub fn prepend(&mut self, product: Product) {
        self.products.insert(0, product);
    }

    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id() == Some(id))
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn to_vec(&self) -> Vec<Product> {
        self.products.clone()
    }

    pub fn clear(&mut self) {
        self.products.clear();
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
