//! PAMM Adapters - collaborators and the redemption desk
//!
//! The pricing core in `pamm_model` only sees numbers. This crate supplies
//! them: a reserve oracle, a supply source and a configuration store, plus
//! the [`RedemptionDesk`] that pulls from the first two, decays the
//! redemption level per block and drives the PAMM.

pub mod config;
pub mod desk;
pub mod error;
pub mod oracle;
pub mod store;
pub mod supply;

pub use config::{default_params, ConfigStore, FileConfig, StaticConfig};
pub use desk::{RedemptionDesk, RedemptionReceipt};
pub use error::{AdapterError, Result};
pub use oracle::{BasketPriceOracle, Holding, PriceOracle, StaticPriceOracle};
pub use store::{load_record, save_record};
pub use supply::{LedgerSupply, SupplySource};
