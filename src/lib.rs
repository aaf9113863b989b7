pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod rates;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Asset, AssetType, CashFlow, Decimal, EntryType, Position, Rate, RateSource, TimeMs, Vault,
    VaultEntry,
};
pub use error::AppError;
pub use orchestration::{PerformanceReporter, PositionAccountant, VaultLedger};
pub use rates::{RateCache, RateResolver};
