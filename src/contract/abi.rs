//! Fixed ABI of the marketplace contract and call-data codecs.

use ethers_core::abi::{parse_abi, Abi, Token};
use ethers_core::types::{Address, U256};
use lazy_static::lazy_static;

use crate::domain::product::wire::ItemRecord;
use crate::error::MarketError;
use crate::shared::ProductId;

/// Human-readable ABI for the six methods the SDK calls.
pub const MARKET_ABI_SIGNATURES: &[&str] = &[
    "function itemCount() view returns (uint256)",
    "function items(uint256 id) view returns (string, uint256, address, bool)",
    "function getItemByOwner(address owner) view returns (uint256[])",
    "function listItems(string name, uint256 price)",
    "function purchaseItem(uint256 id) payable",
    "function transferItem(uint256 id, address newOwner)",
];

lazy_static! {
    static ref MARKET_ABI: Abi =
        parse_abi(MARKET_ABI_SIGNATURES).expect("marketplace ABI signatures are valid");
}

fn encode(method: &str, args: &[Token]) -> Result<Vec<u8>, MarketError> {
    Ok(MARKET_ABI.function(method)?.encode_input(args)?)
}

fn decode(method: &str, data: &[u8]) -> Result<Vec<Token>, MarketError> {
    Ok(MARKET_ABI.function(method)?.decode_output(data)?)
}

fn malformed(method: &str, detail: &str) -> MarketError {
    MarketError::NetworkOrProvider(format!("Unexpected {} output: {}", method, detail))
}

fn uint_to_u64(method: &str, value: U256) -> Result<u64, MarketError> {
    if value > U256::from(u64::MAX) {
        return Err(malformed(method, "integer does not fit in 64 bits"));
    }
    Ok(value.low_u64())
}

// ─── Call data ───────────────────────────────────────────────────────────────

pub fn item_count_call() -> Result<Vec<u8>, MarketError> {
    encode("itemCount", &[])
}

pub fn item_call(id: ProductId) -> Result<Vec<u8>, MarketError> {
    encode("items", &[Token::Uint(U256::from(id.get()))])
}

pub fn items_by_owner_call(owner: Address) -> Result<Vec<u8>, MarketError> {
    encode("getItemByOwner", &[Token::Address(owner)])
}

pub fn list_items_call(name: &str, price_wei: U256) -> Result<Vec<u8>, MarketError> {
    encode(
        "listItems",
        &[Token::String(name.to_string()), Token::Uint(price_wei)],
    )
}

pub fn purchase_item_call(id: ProductId) -> Result<Vec<u8>, MarketError> {
    encode("purchaseItem", &[Token::Uint(U256::from(id.get()))])
}

pub fn transfer_item_call(id: ProductId, new_owner: Address) -> Result<Vec<u8>, MarketError> {
    encode(
        "transferItem",
        &[Token::Uint(U256::from(id.get())), Token::Address(new_owner)],
    )
}

// ─── Return data ─────────────────────────────────────────────────────────────

pub fn decode_item_count(data: &[u8]) -> Result<u64, MarketError> {
    match decode("itemCount", data)?.as_slice() {
        [Token::Uint(count)] => uint_to_u64("itemCount", *count),
        other => Err(malformed("itemCount", &format!("{:?}", other))),
    }
}

pub fn decode_item(id: ProductId, data: &[u8]) -> Result<ItemRecord, MarketError> {
    match decode("items", data)?.as_slice() {
        [Token::String(name), Token::Uint(price), Token::Address(owner), Token::Bool(sold)] => {
            Ok(ItemRecord {
                id,
                name: name.clone(),
                price: *price,
                owner: *owner,
                sold: *sold,
            })
        }
        other => Err(malformed("items", &format!("{:?}", other))),
    }
}

pub fn decode_item_ids(data: &[u8]) -> Result<Vec<ProductId>, MarketError> {
    match decode("getItemByOwner", data)?.as_slice() {
        [Token::Array(ids)] => ids
            .iter()
            .map(|token| match token {
                Token::Uint(id) => uint_to_u64("getItemByOwner", *id).map(ProductId::new),
                other => Err(malformed("getItemByOwner", &format!("{:?}", other))),
            })
            .collect(),
        other => Err(malformed("getItemByOwner", &format!("{:?}", other))),
    }
}
