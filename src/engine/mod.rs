//! Pure computation engines: ledger folding, unstake transitions and return
//! metrics. Nothing here touches the network or the database.

pub mod returns;
pub mod unstake;
pub mod vault_ledger;

pub use returns::{
    annualize_rate, calculate_irr, calculate_irr_based_apr, calculate_irr_with, calculate_roi,
};
pub use unstake::{apply_unstake, validate_stake, AccountingViolation};
pub use vault_ledger::{fold_entries, VaultFold};
