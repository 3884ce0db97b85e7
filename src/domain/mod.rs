//! Domain modules organized as vertical slices.
//!
//! Each sub-module contains:
//! - `mod.rs` — Rich domain types
//! - `wire.rs` — Raw records as the contract returns them
//! - `convert.rs` — `From` conversions from wire to domain
//! - `state.rs` — State containers with update methods
//! - `store.rs` — The stateful service that fetches and reconciles

pub mod product;
