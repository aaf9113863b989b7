//! Stake/unstake accounting end to end over a SQLite-backed repository.

use finledger::db::init_db;
use finledger::domain::{Asset, AssetType, Decimal, EntryType, TimeMs};
use finledger::engine::AccountingViolation;
use finledger::orchestration::{
    AccountingError, PerformanceReporter, PositionAccountant, StakeCommand, UnstakeCommand,
};
use finledger::rates::{FallbackTable, MockRateProvider, RateCache, RateResolver};
use finledger::Repository;
use std::sync::Arc;
use tempfile::TempDir;

const DAY_MS: i64 = 86_400_000;
const T0: i64 = 1_704_067_200_000; // 2024-01-01

struct TestLedger {
    accountant: PositionAccountant,
    performance: PerformanceReporter,
    _temp: TempDir,
}

async fn setup(resolver: RateResolver) -> TestLedger {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let resolver = Arc::new(resolver);

    TestLedger {
        accountant: PositionAccountant::new(repo.clone(), resolver.clone()),
        performance: PerformanceReporter::new(repo, resolver),
        _temp: temp_dir,
    }
}

fn offline_resolver() -> RateResolver {
    RateResolver::new(Arc::new(RateCache::in_memory()), FallbackTable::builtin())
}

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn stake(qty: &str, cost: &str, vault: Option<&str>) -> StakeCommand {
    StakeCommand {
        asset: Asset::crypto("HYPE"),
        account: "main".to_string(),
        qty: d(qty),
        cost_usd: Some(d(cost)),
        at: TimeMs::new(T0),
        vault: vault.map(str::to_string),
    }
}

fn partial(qty: &str, value: &str, day: i64) -> UnstakeCommand {
    UnstakeCommand {
        qty: Some(d(qty)),
        exit_value_usd: Some(d(value)),
        at: TimeMs::new(T0 + day * DAY_MS),
        close_all: false,
    }
}

fn close_all(value: &str, day: i64) -> UnstakeCommand {
    UnstakeCommand {
        qty: None,
        exit_value_usd: Some(d(value)),
        at: TimeMs::new(T0 + day * DAY_MS),
        close_all: true,
    }
}

#[tokio::test]
async fn test_full_close_realizes_against_full_cost() {
    // 500 staked at $1.00, all unstaked for $275
    let t = setup(offline_resolver()).await;
    let position = t.accountant.stake(stake("500", "500", None)).await.unwrap();

    let (closed, pnl) = t
        .accountant
        .unstake(&position.id, close_all("275", 30))
        .await
        .unwrap();

    assert_eq!(pnl.pnl, d("-225"));
    assert_eq!(pnl.roi_pct, d("-45"));
    assert_eq!(closed.remaining_qty, Decimal::zero());
    assert_eq!(closed.exit_date, Some(TimeMs::new(T0 + 30 * DAY_MS)));
    assert!(!closed.is_open());
}

#[tokio::test]
async fn test_partial_unstake_uses_proportional_cost() {
    // 1000 staked at $1.00, 300 unstaked for $330
    let t = setup(offline_resolver()).await;
    let position = t.accountant.stake(stake("1000", "1000", None)).await.unwrap();

    let (after, pnl) = t
        .accountant
        .unstake(&position.id, partial("300", "330", 10))
        .await
        .unwrap();

    assert_eq!(pnl.cost_basis, d("300"));
    assert_eq!(pnl.pnl, d("30"));
    assert_eq!(pnl.roi_pct, d("10"));
    assert_eq!(after.remaining_qty, d("700"));
    assert!(after.is_open());
    assert!(after.exit_date.is_none());
}

#[tokio::test]
async fn test_three_partials_sum_to_single_close() {
    let t = setup(offline_resolver()).await;
    let position = t.accountant.stake(stake("1000", "1000", None)).await.unwrap();

    let mut total = Decimal::zero();
    for (i, (qty, value)) in [("300", "330"), ("400", "480"), ("300", "270")]
        .iter()
        .enumerate()
    {
        let (_, pnl) = t
            .accountant
            .unstake(&position.id, partial(qty, value, i as i64 + 1))
            .await
            .unwrap();
        total += pnl.pnl;
    }

    let stored = t.accountant.get_position(&position.id).await.unwrap();
    assert_eq!(total, d("80"));
    assert_eq!(stored.realized_pnl, d("80"));
    assert_eq!(stored.blended_roi_pct(), d("8"));
    assert_eq!(stored.remaining_qty, Decimal::zero());
    assert!(!stored.is_open());

    // identical to closing everything at once for the same total value
    let single = t.accountant.stake(stake("1000", "1000", None)).await.unwrap();
    let (_, pnl) = t
        .accountant
        .unstake(&single.id, close_all("1080", 3))
        .await
        .unwrap();
    assert_eq!(pnl.pnl, total);

    let exits = t.accountant.list_exits(&position.id).await.unwrap();
    assert_eq!(exits.len(), 3);
    let cost_sum: Decimal = exits.iter().map(|e| e.cost_basis).sum();
    assert_eq!(cost_sum, d("1000"));
}

#[tokio::test]
async fn test_uneven_partials_stay_additive() {
    let t = setup(offline_resolver()).await;
    let position = t.accountant.stake(stake("3", "100", None)).await.unwrap();

    let mut total = Decimal::zero();
    for (day, value) in [(1, "40"), (2, "35"), (3, "50")] {
        let (_, pnl) = t
            .accountant
            .unstake(&position.id, partial("1", value, day))
            .await
            .unwrap();
        total += pnl.pnl;
    }

    // 125 received against 100 of cost, within decimal precision
    assert!((total.to_f64() - 25.0).abs() < 1e-12);
    let stored = t.accountant.get_position(&position.id).await.unwrap();
    assert!(!stored.is_open());
}

#[tokio::test]
async fn test_over_unstake_and_closed_position_are_rejected() {
    let t = setup(offline_resolver()).await;
    let position = t.accountant.stake(stake("10", "10", None)).await.unwrap();

    let err = t
        .accountant
        .unstake(&position.id, partial("10.5", "11", 1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AccountingError::Violation(AccountingViolation::InsufficientQuantity { .. })
    ));

    let err = t
        .accountant
        .unstake(&position.id, partial("-1", "1", 1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AccountingError::Violation(AccountingViolation::NonPositiveQuantity(_))
    ));

    t.accountant
        .unstake(&position.id, partial("10", "12", 2))
        .await
        .unwrap();
    let err = t
        .accountant
        .unstake(&position.id, close_all("1", 3))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AccountingError::Violation(AccountingViolation::PositionClosed(_))
    ));
}

#[tokio::test]
async fn test_concurrent_unstakes_never_oversell() {
    let t = setup(offline_resolver()).await;
    let accountant = Arc::new(t.accountant.clone());
    let position = accountant.stake(stake("10", "100", None)).await.unwrap();

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let accountant = accountant.clone();
            let id = position.id.clone();
            tokio::spawn(async move { accountant.unstake(&id, partial("4", "50", i + 1)).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(AccountingError::Conflict(_))
            | Err(AccountingError::Violation(AccountingViolation::InsufficientQuantity { .. })) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    // 4 + 4 fit into 10, a third 4 never does
    assert!((1..=2).contains(&succeeded));
    let stored = accountant.get_position(&position.id).await.unwrap();
    let exits = accountant.list_exits(&position.id).await.unwrap();
    assert_eq!(exits.len(), succeeded);
    assert_eq!(stored.exit_count, succeeded as i64);
    assert_eq!(stored.remaining_qty, d("10") - d("4") * Decimal::from_i64(succeeded as i64));
}

#[tokio::test]
async fn test_vault_receives_stake_and_unstake_entries() {
    let t = setup(offline_resolver()).await;
    let position = t
        .accountant
        .stake(stake("1000", "1000", Some("hlp")))
        .await
        .unwrap();
    t.accountant
        .unstake(&position.id, partial("300", "330", 10))
        .await
        .unwrap();

    let ledger = t.accountant.ledger();
    let entries = ledger.entries("hlp").await.unwrap();
    let kinds: Vec<_> = entries.iter().map(|e| e.entry_type).collect();
    assert_eq!(kinds, vec![EntryType::Deposit, EntryType::Withdraw]);
    assert_eq!(
        entries[1].reference.as_deref(),
        Some(format!("unstake:{}:1", position.id).as_str())
    );

    let stats = ledger.vault_stats("hlp").await.unwrap();
    assert_eq!(stats.total_deposited_usd, d("1000"));
    assert_eq!(stats.total_withdrawn_usd, d("330"));
    assert_eq!(stats.balances.get("CRYPTO:HYPE"), Some(&d("700")));
}

#[tokio::test]
async fn test_missing_values_priced_by_resolver() {
    let mock = MockRateProvider::new("CG", AssetType::Crypto).with_price("HYPE", d("1.2"));
    let t = setup(offline_resolver().with_crypto_provider(Arc::new(mock.clone()))).await;

    let mut cmd = stake("100", "0", None);
    cmd.cost_usd = None;
    let position = t.accountant.stake(cmd).await.unwrap();
    assert_eq!(position.deposit_cost, d("120"));

    let (_, pnl) = t
        .accountant
        .unstake(
            &position.id,
            UnstakeCommand {
                qty: Some(d("50")),
                exit_value_usd: None,
                at: TimeMs::new(T0),
                close_all: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(pnl.exit_value_usd, d("60"));
    assert_eq!(pnl.pnl, Decimal::zero());
    // same asset-day: one provider call
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_position_performance_after_partial_exit() {
    let mock = MockRateProvider::new("CG", AssetType::Crypto).with_price("HYPE", d("2"));
    let t = setup(offline_resolver().with_crypto_provider(Arc::new(mock))).await;
    let position = t.accountant.stake(stake("100", "100", None)).await.unwrap();
    t.accountant
        .unstake(&position.id, partial("50", "75", 100))
        .await
        .unwrap();

    let report = t
        .performance
        .position_performance(&position.id)
        .await
        .unwrap();
    assert_eq!(report.realized_pnl, d("25"));
    assert_eq!(report.blended_roi_pct, d("50"));
    assert_eq!(report.unrealized_value_usd, d("100"));
    assert_eq!(report.cash_flows.len(), 3);
    // 75 + 100 back on 100 in
    assert!((report.total_roi_pct - 75.0).abs() < 1e-9);
    assert!(report.irr > 0.0);
}
