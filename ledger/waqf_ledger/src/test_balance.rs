use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::balance::{
    calculate_balance, has_matured_tranches, matured_tranches, sort_by_maturity, sorted_statuses,
};
use crate::fixtures::*;
use crate::invariants::assert_buckets_consistent;
use crate::timestamp::NanoTimestamp;
use crate::types::{TrancheLifecycle, WaqfType};

#[test]
fn test_buckets_cover_every_tranche() {
    let waqf = revolving_waqf(
        dec!(5000),
        vec![
            tranche("l1", dec!(100), now().add_days(10)),
            returned_tranche("r1", dec!(50), now().add_days(-30)),
            tranche("m1", dec!(200), now().add_days(-1)),
            tranche("l2", dec!(300), now().add_days(40)),
            tranche("m2", dec!(400), now()),
            tranche("l3", dec!(500.25), now().add_millis(1)),
        ],
    );

    let balance = calculate_balance(&waqf, now());
    assert_buckets_consistent(&balance, 6);

    assert_eq!(balance.locked_tranches.len(), 3);
    assert_eq!(balance.matured_tranches.len(), 2);
    assert_eq!(balance.returned_tranches.len(), 1);
    assert_eq!(balance.locked_balance, dec!(900.25));
    assert_eq!(balance.matured_balance, dec!(600));
    assert_eq!(balance.returned_balance, dec!(50));

    // Buckets keep insertion order.
    let locked: Vec<_> = balance.locked_tranches.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(locked, vec!["l1", "l2", "l3"]);
}

#[test]
fn test_total_principal_comes_from_ledger_total() {
    let waqf = revolving_waqf(dec!(5000), vec![tranche("l1", dec!(100), now().add_days(10))]);
    let balance = calculate_balance(&waqf, now());
    assert_eq!(balance.total_principal, dec!(10000));
}

#[test]
fn test_next_maturity_is_earliest_locked_tranche() {
    let waqf = revolving_waqf(
        dec!(5000),
        vec![
            tranche("five", dec!(500), now().add_days(5)),
            tranche("ten", dec!(1000), now().add_days(10)),
            tranche("two", dec!(200), now().add_days(2)),
            tranche("past", dec!(999), now().add_days(-1)),
        ],
    );

    let balance = calculate_balance(&waqf, now());
    assert_eq!(
        balance.next_maturity_date,
        Some(NanoTimestamp::from_timestamp(now().add_days(2)))
    );
    assert_eq!(balance.next_maturity_amount, dec!(200));
}

#[test]
fn test_next_maturity_tie_prefers_exact_instant_then_insertion_order() {
    // Both round up to 3 days; the second matures first.
    let waqf = revolving_waqf(
        dec!(5000),
        vec![
            tranche("late", dec!(10), now().add_days(2).add_millis(5 * HOUR)),
            tranche("early", dec!(20), now().add_days(2).add_millis(HOUR)),
            tranche("early-twin", dec!(30), now().add_days(2).add_millis(HOUR)),
        ],
    );

    let balance = calculate_balance(&waqf, now());
    assert_eq!(balance.next_maturity_amount, dec!(20));
}

#[test]
fn test_no_locked_tranches_means_no_next_maturity() {
    let waqf = revolving_waqf(dec!(5000), vec![tranche("m1", dec!(100), now().add_days(-3))]);
    let balance = calculate_balance(&waqf, now());
    assert_eq!(balance.next_maturity_date, None);
    assert_eq!(balance.next_maturity_amount, Decimal::ZERO);
}

#[test]
fn test_missing_or_empty_tranches_yield_zeros() {
    let empty = revolving_waqf(dec!(5000), vec![]);
    let mut missing = empty.clone();
    missing.revolving_mut().unwrap().contribution_tranches = None;
    let mut permanent = revolving_waqf(dec!(5000), vec![tranche("x", dec!(1), now())]);
    permanent.waqf_type = WaqfType::Permanent;

    for waqf in [empty, missing, permanent] {
        let balance = calculate_balance(&waqf, now());
        assert_buckets_consistent(&balance, 0);
        assert_eq!(balance.locked_balance, Decimal::ZERO);
        assert_eq!(balance.matured_balance, Decimal::ZERO);
        assert_eq!(balance.returned_balance, Decimal::ZERO);
        assert_eq!(balance.next_maturity_date, None);
        assert_eq!(balance.total_principal, dec!(10000));
    }
}

#[test]
fn test_aggregation_moves_with_the_clock() {
    let waqf = revolving_waqf(dec!(5000), vec![tranche("t1", dec!(100), now().add_days(1))]);

    let before = calculate_balance(&waqf, now());
    let after = calculate_balance(&waqf, now().add_days(1));
    assert_eq!(before.locked_balance, dec!(100));
    assert_eq!(after.locked_balance, Decimal::ZERO);
    assert_eq!(after.matured_balance, dec!(100));
}

#[test]
fn test_sort_by_maturity_is_earliest_first_and_stable() {
    let waqf = revolving_waqf(
        dec!(5000),
        vec![
            tranche("c", dec!(1), now().add_days(30)),
            tranche("a", dec!(1), now().add_days(-3)),
            tranche("b1", dec!(1), now().add_days(7)),
            tranche("b2", dec!(1), now().add_days(7)),
        ],
    );

    let ids: Vec<_> = sorted_statuses(&waqf, now())
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec!["a", "b1", "b2", "c"]);

    // Sorting never reorders the stored collection.
    let stored: Vec<_> = waqf.tranches().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(stored, vec!["c", "a", "b1", "b2"]);

    let balance = calculate_balance(&waqf, now());
    let resorted = sort_by_maturity(&balance.locked_tranches);
    assert_eq!(resorted[0].id, "b1");
}

#[test]
fn test_matured_tranches_excludes_settled_and_locked() {
    let mut rolling = tranche("rolling", dec!(40), now().add_days(-2));
    rolling.status = Some(TrancheLifecycle::ReturnScheduled);

    let waqf = revolving_waqf(
        dec!(5000),
        vec![
            tranche("ready", dec!(10), now().add_days(-1)),
            returned_tranche("gone", dec!(20), now().add_days(-9)),
            tranche("locked", dec!(30), now().add_days(9)),
            rolling,
        ],
    );

    let ready: Vec<_> = matured_tranches(&waqf, now())
        .into_iter()
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(ready, vec!["ready"]);
    assert!(has_matured_tranches(&waqf, now()));
    assert!(!has_matured_tranches(&waqf, now().add_days(-5)));
}

#[tokio::test]
async fn test_ledger_balance_reads_through_store() {
    let waqf = revolving_waqf(
        dec!(5000),
        vec![
            tranche("t1", dec!(100), now().add_days(-1)),
            tranche("t2", dec!(250), now().add_days(3)),
        ],
    );
    let ledger = ledger_with(&waqf).await;

    let balance = ledger.balance(WAQF_ID).await.unwrap();
    assert_eq!(balance.matured_balance, dec!(100));
    assert_eq!(balance.locked_balance, dec!(250));

    ledger.return_tranche(WAQF_ID, "t1").await.unwrap();
    let balance = ledger.balance(WAQF_ID).await.unwrap();
    assert_eq!(balance.returned_balance, dec!(100));
    assert_eq!(balance.matured_balance, Decimal::ZERO);

    let statuses = ledger.tranche_statuses(WAQF_ID).await.unwrap();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].id, "t1");
}

#[test]
fn test_huge_amounts_saturate_instead_of_overflowing() {
    let waqf = revolving_waqf(
        dec!(5000),
        vec![
            tranche("big-1", dec!(50000000000000000000000000000), now().add_days(3)),
            tranche("big-2", dec!(50000000000000000000000000000), now().add_days(4)),
            tranche("small", dec!(1), now().add_days(-1)),
        ],
    );

    let balance = calculate_balance(&waqf, now());
    assert_eq!(balance.locked_balance, Decimal::MAX);
    assert_eq!(balance.matured_balance, dec!(1));
    assert_buckets_consistent(&balance, 3);
}
