//! Domain types for the valuation and ledger core.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Primitives: TimeMs, Asset, AssetType
//! - Rates with provenance, vault ledger entries, stake positions
//! - Cash-flow points for return calculations

pub mod cashflow;
pub mod decimal;
pub mod position;
pub mod primitives;
pub mod rate;
pub mod vault;

pub use cashflow::CashFlow;
pub use decimal::Decimal;
pub use position::{Position, PositionExit, RealizedPnl, UnstakeRequest};
pub use primitives::{Asset, AssetParseError, AssetType, TimeMs};
pub use rate::{rate_cache_key, Rate, RateQuery, RateSource};
pub use vault::{EntryType, Vault, VaultEntry, VaultStatus};
