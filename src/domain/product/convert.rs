use super::wire::ItemRecord;
use super::{Product, ProductKey};

impl From<ItemRecord> for Product {
    fn from(record: ItemRecord) -> Self {
        Product {
            key: ProductKey::Confirmed(record.id),
            name: record.name,
            price_wei: record.price,
            owner: record.owner,
            sold: record.sold,
        }
    }
}
