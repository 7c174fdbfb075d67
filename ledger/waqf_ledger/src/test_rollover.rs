use rust_decimal_macros::dec;

use crate::fixtures::*;
use crate::invariants::{assert_insertion_order_preserved, assert_returns_monotonic};
use crate::maturity::compute_maturity_date;
use crate::timestamp::NanoTimestamp;
use crate::types::TrancheLifecycle;
use crate::LedgerError;

#[tokio::test]
async fn test_rollover_relocks_principal_in_new_tranche() {
    let waqf = revolving_waqf(dec!(2000), vec![tranche("t1", dec!(750), now().add_days(-1))]);
    let ledger = ledger_with(&waqf).await;

    let receipt = ledger
        .rollover_tranche(WAQF_ID, "t1", 6, Some("cause-water"))
        .await
        .unwrap();

    let stamp = NanoTimestamp::from_timestamp(now());
    let expected_maturity =
        NanoTimestamp::from_timestamp(compute_maturity_date(6, now()).unwrap());
    assert_eq!(receipt.new_tranche_id, format!("tranche_rollover_t1_{stamp}"));
    assert_eq!(receipt.new_maturity_date, expected_maturity);
    assert_eq!(receipt.amount, dec!(750));

    let stored = ledger.load(WAQF_ID).await.unwrap();
    // Principal stays locked, so the balance does not move.
    assert_eq!(stored.waqf.financial.current_balance, dec!(2000));

    let tranches = stored.waqf.tranches();
    assert_eq!(tranches.len(), 2);

    let original = &tranches[0];
    assert!(original.is_returned);
    assert_eq!(original.status, Some(TrancheLifecycle::RolledOver));
    assert_eq!(original.returned_date, Some(stamp));
    assert_eq!(original.rollover_target_id.as_deref(), Some(receipt.new_tranche_id.as_str()));

    let successor = &tranches[1];
    assert_eq!(successor.id, receipt.new_tranche_id);
    assert!(!successor.is_returned);
    assert_eq!(successor.amount, dec!(750));
    assert_eq!(successor.contribution_date, stamp);
    assert_eq!(successor.maturity_date, expected_maturity);
    assert_eq!(successor.rollover_origin_id.as_deref(), Some("t1"));

    let notes = stored
        .waqf
        .revolving()
        .unwrap()
        .pending_notifications
        .clone()
        .unwrap();
    assert!(notes[0].contains("rolled over for 6 months"));
    assert!(notes[0].ends_with("(target cause: cause-water)."));

    assert_returns_monotonic(&waqf, &stored.waqf);
    assert_insertion_order_preserved(&waqf, &stored.waqf);
}

#[tokio::test]
async fn test_rolled_over_tranche_cannot_be_returned_or_rolled_again() {
    let waqf = revolving_waqf(dec!(2000), vec![tranche("t1", dec!(750), now().add_days(-1))]);
    let ledger = ledger_with(&waqf).await;
    ledger.rollover_tranche(WAQF_ID, "t1", 3, None).await.unwrap();

    assert_eq!(
        ledger.return_tranche(WAQF_ID, "t1").await.unwrap_err(),
        LedgerError::AlreadyReturned("t1".to_string())
    );
    assert_eq!(
        ledger.rollover_tranche(WAQF_ID, "t1", 3, None).await.unwrap_err(),
        LedgerError::AlreadyReturned("t1".to_string())
    );
}

#[tokio::test]
async fn test_successor_is_returnable_after_its_own_maturity() {
    let waqf = revolving_waqf(dec!(2000), vec![tranche("t1", dec!(750), now().add_days(-1))]);
    let ledger = ledger_with(&waqf).await;
    let rolled = ledger.rollover_tranche(WAQF_ID, "t1", 1, None).await.unwrap();

    assert!(matches!(
        ledger.return_tranche(WAQF_ID, &rolled.new_tranche_id).await,
        Err(LedgerError::NotMatured { .. })
    ));

    ledger.clock().set(rolled.new_maturity_date.to_timestamp());
    let receipt = ledger
        .return_tranche(WAQF_ID, &rolled.new_tranche_id)
        .await
        .unwrap();
    assert_eq!(receipt.new_balance, dec!(1250));
}

#[tokio::test]
async fn test_rollover_requires_maturity() {
    let waqf = revolving_waqf(dec!(2000), vec![tranche("t1", dec!(750), now().add_days(2))]);
    let ledger = ledger_with(&waqf).await;

    let err = ledger.rollover_tranche(WAQF_ID, "t1", 6, None).await.unwrap_err();
    assert_eq!(
        err,
        LedgerError::NotMatured {
            tranche_id: "t1".to_string(),
            days_remaining: 2,
        }
    );
}

#[tokio::test]
async fn test_rollover_period_must_be_in_range() {
    let waqf = revolving_waqf(dec!(2000), vec![tranche("t1", dec!(750), now().add_days(-1))]);
    let ledger = ledger_with(&waqf).await;

    assert_eq!(
        ledger.rollover_tranche(WAQF_ID, "t1", 0, None).await.unwrap_err(),
        LedgerError::InvalidRolloverPeriod(0)
    );
    assert_eq!(
        ledger.rollover_tranche(WAQF_ID, "t1", 241, None).await.unwrap_err(),
        LedgerError::InvalidRolloverPeriod(241)
    );

    let stored = ledger.load(WAQF_ID).await.unwrap();
    assert_eq!(stored.waqf.tranches().len(), 1);
}
