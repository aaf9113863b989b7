//! Money-weighted return metrics over irregular cash-flow timelines.
//!
//! All functions here are pure and operate on `f64`; callers convert from
//! `Decimal` at the boundary.

use crate::domain::CashFlow;

pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Holding periods shorter than this are reported as plain ROI.
pub const MIN_ANNUALIZATION_DAYS: f64 = 30.0;

const DAYS_PER_YEAR: f64 = 365.0;
const RATE_FLOOR: f64 = -0.999;
const RATE_CEILING: f64 = 10.0;
const DERIVATIVE_EPSILON: f64 = 1e-12;
const CAPITAL_EPSILON: f64 = 1e-9;

/// IRR with the default iteration budget and tolerance.
pub fn calculate_irr(cash_flows: &[CashFlow]) -> f64 {
    calculate_irr_with(cash_flows, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE)
}

/// Annual rate `r` such that `Σ amount_i / (1+r)^(days_i/365) = 0`.
///
/// Returns 0 when nothing was deposited and -1 for a total loss in the
/// two-flow case. Never fails: if Newton-Raphson does not converge the simple
/// annualized return over the whole span is returned instead.
pub fn calculate_irr_with(cash_flows: &[CashFlow], max_iterations: usize, tolerance: f64) -> f64 {
    let total_in = total_deposited(cash_flows);
    if total_in.abs() < CAPITAL_EPSILON {
        return 0.0;
    }

    if let Some(rate) = closed_form_irr(cash_flows) {
        return rate;
    }

    let total_out = total_withdrawn(cash_flows);
    let mut rate = ((total_out - total_in) / total_in).clamp(RATE_FLOOR, RATE_CEILING);

    for _ in 0..max_iterations {
        let (npv, derivative) = npv_and_derivative(cash_flows, rate);
        if derivative.abs() < DERIVATIVE_EPSILON {
            break;
        }

        let next = (rate - npv / derivative).clamp(RATE_FLOOR, RATE_CEILING);
        if !next.is_finite() {
            break;
        }
        if (next - rate).abs() < tolerance {
            return next;
        }
        rate = next;
    }

    simple_annualized_return(cash_flows)
}

/// APR in percent. Short windows are not extrapolated to a year.
///
/// `roi` is a fraction (0.1 = 10%).
pub fn calculate_irr_based_apr(cash_flows: &[CashFlow], total_days: f64, roi: f64) -> f64 {
    if total_days < MIN_ANNUALIZATION_DAYS {
        return roi * 100.0;
    }
    calculate_irr(cash_flows) * 100.0
}

/// `profit / cost * 100`, or 0 when there is no cost.
pub fn calculate_roi(profit: f64, cost: f64) -> f64 {
    if cost <= 0.0 {
        return 0.0;
    }
    profit / cost * 100.0
}

/// Compound a period return over a year, in percent.
pub fn annualize_rate(rate: f64, days: f64) -> f64 {
    if days <= 0.0 {
        return rate * 100.0;
    }
    ((1.0 + rate).powf(DAYS_PER_YEAR / days) - 1.0) * 100.0
}

/// Sum of money put in, as a positive number.
pub fn total_deposited(cash_flows: &[CashFlow]) -> f64 {
    cash_flows
        .iter()
        .filter(|cf| cf.amount < 0.0)
        .map(|cf| -cf.amount)
        .sum()
}

/// Sum of money taken out.
pub fn total_withdrawn(cash_flows: &[CashFlow]) -> f64 {
    cash_flows
        .iter()
        .filter(|cf| cf.amount > 0.0)
        .map(|cf| cf.amount)
        .sum()
}

/// Exact IRR for one deposit followed by one terminal value.
fn closed_form_irr(cash_flows: &[CashFlow]) -> Option<f64> {
    let [first, second] = cash_flows else {
        return None;
    };
    let (deposit, terminal) = if first.days_from_start <= second.days_from_start {
        (first, second)
    } else {
        (second, first)
    };
    if deposit.amount >= 0.0 || terminal.amount < 0.0 {
        return None;
    }

    let ratio = terminal.amount / -deposit.amount;
    if ratio <= 0.0 {
        return Some(-1.0);
    }

    let days = terminal.days_from_start - deposit.days_from_start;
    if days <= 0.0 {
        return Some(ratio - 1.0);
    }
    Some(ratio.powf(DAYS_PER_YEAR / days) - 1.0)
}

fn npv_and_derivative(cash_flows: &[CashFlow], rate: f64) -> (f64, f64) {
    let base = 1.0 + rate;
    cash_flows.iter().fold((0.0, 0.0), |(npv, d_npv), cf| {
        let t = cf.days_from_start / DAYS_PER_YEAR;
        let discount = base.powf(t);
        (
            npv + cf.amount / discount,
            d_npv - t * cf.amount / (discount * base),
        )
    })
}

fn simple_annualized_return(cash_flows: &[CashFlow]) -> f64 {
    let total_in = total_deposited(cash_flows);
    if total_in.abs() < CAPITAL_EPSILON {
        return 0.0;
    }
    let simple = (total_withdrawn(cash_flows) - total_in) / total_in;

    let total_days = span_days(cash_flows);
    if total_days <= 0.0 {
        return simple;
    }
    if 1.0 + simple <= 0.0 {
        return -1.0;
    }
    (1.0 + simple).powf(DAYS_PER_YEAR / total_days) - 1.0
}

fn span_days(cash_flows: &[CashFlow]) -> f64 {
    let first = cash_flows
        .iter()
        .map(|cf| cf.days_from_start)
        .fold(f64::INFINITY, f64::min);
    let last = cash_flows
        .iter()
        .map(|cf| cf.days_from_start)
        .fold(f64::NEG_INFINITY, f64::max);
    if first.is_finite() && last.is_finite() {
        last - first
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npv(cash_flows: &[CashFlow], rate: f64) -> f64 {
        npv_and_derivative(cash_flows, rate).0
    }

    #[test]
    fn test_closed_form_one_year() {
        let flows = [CashFlow::new(-1000.0, 0.0), CashFlow::new(1200.0, 365.0)];
        assert!((calculate_irr(&flows) - 0.20).abs() < 1e-9);
    }

    #[test]
    fn test_closed_form_half_year_compounds() {
        let flows = [CashFlow::new(-1000.0, 0.0), CashFlow::new(1100.0, 182.5)];
        let expected = 1.1f64.powf(2.0) - 1.0;
        assert!((calculate_irr(&flows) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_closed_form_total_loss() {
        let flows = [CashFlow::new(-1000.0, 0.0), CashFlow::new(0.0, 100.0)];
        assert_eq!(calculate_irr(&flows), -1.0);
    }

    #[test]
    fn test_no_capital_returns_zero() {
        assert_eq!(calculate_irr(&[]), 0.0);
        assert_eq!(calculate_irr(&[CashFlow::new(500.0, 10.0)]), 0.0);
    }

    #[test]
    fn test_newton_solves_multiple_deposits() {
        let flows = [
            CashFlow::new(-1000.0, 0.0),
            CashFlow::new(-500.0, 90.0),
            CashFlow::new(200.0, 180.0),
            CashFlow::new(1500.0, 365.0),
        ];
        let irr = calculate_irr(&flows);
        assert!(irr > 0.0 && irr < 0.3, "irr = {}", irr);
        assert!(npv(&flows, irr).abs() < 1e-6);
    }

    #[test]
    fn test_newton_negative_return() {
        let flows = [
            CashFlow::new(-1000.0, 0.0),
            CashFlow::new(-1000.0, 100.0),
            CashFlow::new(1500.0, 400.0),
        ];
        let irr = calculate_irr(&flows);
        assert!(irr < 0.0);
        assert!(npv(&flows, irr).abs() < 1e-6);
    }

    #[test]
    fn test_non_convergence_falls_back_to_simple_annualized() {
        // A zero iteration budget forces the fallback path.
        let flows = [
            CashFlow::new(-1000.0, 0.0),
            CashFlow::new(-1000.0, 100.0),
            CashFlow::new(2200.0, 365.0),
        ];
        let fallback = calculate_irr_with(&flows, 0, DEFAULT_TOLERANCE);
        assert!((fallback - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_irr_based_apr_short_window_uses_roi() {
        let flows = [CashFlow::new(-1000.0, 0.0), CashFlow::new(1010.0, 10.0)];
        assert_eq!(calculate_irr_based_apr(&flows, 10.0, 0.01), 1.0);
    }

    #[test]
    fn test_irr_based_apr_long_window_uses_irr() {
        let flows = [CashFlow::new(-1000.0, 0.0), CashFlow::new(1200.0, 365.0)];
        let apr = calculate_irr_based_apr(&flows, 365.0, 0.2);
        assert!((apr - 20.0).abs() < 1e-7);
    }

    #[test]
    fn test_roi() {
        assert_eq!(calculate_roi(30.0, 300.0), 10.0);
        assert_eq!(calculate_roi(-225.0, 500.0), -45.0);
        assert_eq!(calculate_roi(10.0, 0.0), 0.0);
        assert_eq!(calculate_roi(10.0, -5.0), 0.0);
    }

    #[test]
    fn test_annualize_rate() {
        assert!((annualize_rate(0.1, 365.0) - 10.0).abs() < 1e-9);
        let half_year = annualize_rate(0.05, 182.5);
        assert!((half_year - 10.25).abs() < 1e-9);
        assert_eq!(annualize_rate(0.05, 0.0), 5.0);
    }
}
