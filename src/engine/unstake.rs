//! Pure stake/unstake transitions with cost-basis accounting.

use crate::domain::{Decimal, Position, RealizedPnl, UnstakeRequest};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountingViolation {
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),
    #[error("cost must not be negative, got {0}")]
    NegativeCost(Decimal),
    #[error("exit value must not be negative, got {0}")]
    NegativeExitValue(Decimal),
    #[error("partial unstake requires a quantity")]
    MissingQuantity,
    #[error("unstake quantity {requested} exceeds remaining {remaining}")]
    InsufficientQuantity {
        requested: Decimal,
        remaining: Decimal,
    },
    #[error("position {0} is already closed")]
    PositionClosed(String),
}

/// Validate the inputs of a stake before a position is opened.
pub fn validate_stake(qty: Decimal, cost_usd: Decimal) -> Result<(), AccountingViolation> {
    if !qty.is_positive() {
        return Err(AccountingViolation::NonPositiveQuantity(qty));
    }
    if cost_usd.is_negative() {
        return Err(AccountingViolation::NegativeCost(cost_usd));
    }
    Ok(())
}

/// Apply one unstake to `position`, returning the new state and the PnL
/// realized by this exit. The input position is left untouched.
///
/// - `close_all` exits the whole remaining quantity against the full original
///   `deposit_cost`, whatever was exited before.
/// - A partial exit's cost basis is `qty / deposit_qty * deposit_cost`, always
///   against the original stake quantity.
/// - Requests above the remaining quantity are rejected, never clamped.
pub fn apply_unstake(
    position: &Position,
    request: &UnstakeRequest,
) -> Result<(Position, RealizedPnl), AccountingViolation> {
    if !position.is_open() {
        return Err(AccountingViolation::PositionClosed(position.id.clone()));
    }
    if request.exit_value_usd.is_negative() {
        return Err(AccountingViolation::NegativeExitValue(request.exit_value_usd));
    }

    let (qty, cost_basis) = if request.close_all {
        (position.remaining_qty, position.deposit_cost)
    } else {
        let qty = request.qty.ok_or(AccountingViolation::MissingQuantity)?;
        if !qty.is_positive() {
            return Err(AccountingViolation::NonPositiveQuantity(qty));
        }
        if qty > position.remaining_qty {
            return Err(AccountingViolation::InsufficientQuantity {
                requested: qty,
                remaining: position.remaining_qty,
            });
        }
        (qty, position.cost_basis_for(qty))
    };

    let pnl = request.exit_value_usd - cost_basis;
    let roi_pct = pnl.pct_of(cost_basis);

    let mut next = position.clone();
    next.remaining_qty = position.remaining_qty - qty;
    next.realized_pnl = position.realized_pnl + pnl;
    next.exit_value_total = position.exit_value_total + request.exit_value_usd;
    next.exit_count = position.exit_count + 1;

    let closed = request.close_all || next.remaining_qty.is_zero();
    if closed {
        next.remaining_qty = Decimal::zero();
        next.exit_date = Some(request.at);
    }

    Ok((
        next,
        RealizedPnl {
            qty,
            exit_value_usd: request.exit_value_usd,
            cost_basis,
            pnl,
            roi_pct,
            closed,
        },
    ))
}
