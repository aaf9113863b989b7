use finledger::domain::CashFlow;
use finledger::engine::returns::{total_deposited, total_withdrawn};
use finledger::engine::{
    annualize_rate, calculate_irr, calculate_irr_based_apr, calculate_irr_with, calculate_roi,
};

fn npv(flows: &[CashFlow], rate: f64) -> f64 {
    flows
        .iter()
        .map(|cf| cf.amount / (1.0 + rate).powf(cf.days_from_start / 365.0))
        .sum()
}

#[test]
fn test_single_year_twenty_percent() {
    let flows = [CashFlow::new(-1000.0, 0.0), CashFlow::new(1200.0, 365.0)];
    let irr = calculate_irr(&flows);
    assert!((irr - 0.20).abs() < 1e-6, "irr = {}", irr);
}

#[test]
fn test_multi_flow_irr_zeroes_npv() {
    let flows = [
        CashFlow::new(-1000.0, 0.0),
        CashFlow::new(-500.0, 90.0),
        CashFlow::new(300.0, 180.0),
        CashFlow::new(1400.0, 365.0),
    ];
    let irr = calculate_irr(&flows);
    assert!(irr > 0.0 && irr < 1.0, "irr = {}", irr);
    assert!(npv(&flows, irr).abs() < 1e-6);
}

#[test]
fn test_losing_timeline_has_negative_irr() {
    let flows = [
        CashFlow::new(-1000.0, 0.0),
        CashFlow::new(200.0, 100.0),
        CashFlow::new(600.0, 300.0),
    ];
    let irr = calculate_irr(&flows);
    assert!(irr < 0.0 && irr > -1.0, "irr = {}", irr);
    assert!(npv(&flows, irr).abs() < 1e-6);
}

#[test]
fn test_nothing_deposited_is_zero() {
    assert_eq!(calculate_irr(&[]), 0.0);
    assert_eq!(calculate_irr(&[CashFlow::new(500.0, 10.0)]), 0.0);
}

#[test]
fn test_total_loss_is_minus_one() {
    let flows = [CashFlow::new(-1000.0, 0.0), CashFlow::new(0.0, 200.0)];
    assert_eq!(calculate_irr(&flows), -1.0);
}

#[test]
fn test_exhausted_iterations_fall_back_to_simple_annualized() {
    let flows = [
        CashFlow::new(-1000.0, 0.0),
        CashFlow::new(500.0, 100.0),
        CashFlow::new(600.0, 365.0),
    ];
    // no Newton step allowed: simple 10% over exactly one year
    let irr = calculate_irr_with(&flows, 0, 1e-10);
    assert!((irr - 0.10).abs() < 1e-9, "irr = {}", irr);
}

#[test]
fn test_short_window_apr_is_plain_roi() {
    let flows = [CashFlow::new(-1000.0, 0.0), CashFlow::new(1010.0, 10.0)];
    let apr = calculate_irr_based_apr(&flows, 10.0, 0.01);
    assert!((apr - 1.0).abs() < 1e-12);

    // from 30 days on the IRR is annualized
    let flows = [CashFlow::new(-1000.0, 0.0), CashFlow::new(1010.0, 30.0)];
    let apr = calculate_irr_based_apr(&flows, 30.0, 0.01);
    assert!(apr > 10.0, "apr = {}", apr);
}

#[test]
fn test_roi_and_annualization() {
    assert_eq!(calculate_roi(30.0, 300.0), 10.0);
    assert_eq!(calculate_roi(50.0, 0.0), 0.0);
    assert!((annualize_rate(0.10, 365.0) - 10.0).abs() < 1e-9);
    // 10% over half a year compounds to 21%
    assert!((annualize_rate(0.10, 182.5) - 21.0).abs() < 1e-9);
    assert_eq!(annualize_rate(0.05, 0.0), 5.0);
}

#[test]
fn test_flow_totals() {
    let flows = [
        CashFlow::outflow(1000.0, 0.0),
        CashFlow::outflow(250.0, 30.0),
        CashFlow::inflow(400.0, 60.0),
    ];
    assert_eq!(total_deposited(&flows), 1250.0);
    assert_eq!(total_withdrawn(&flows), 400.0);
}
