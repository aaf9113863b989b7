pub mod accountant;
pub mod ledger;
pub mod performance;

pub use accountant::{AccountingError, PositionAccountant, StakeCommand, UnstakeCommand};
pub use ledger::{LedgerError, VaultLedger, VaultStats};
pub use performance::{PerformanceReporter, PositionPerformance, VaultPerformance};
