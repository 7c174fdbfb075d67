#![allow(dead_code)]

use rust_decimal::Decimal;

use crate::balance::RevolvingWaqfBalance;
use crate::status::TrancheState;
use crate::types::WaqfProfile;

/// INV-1: The current balance is never negative.
pub fn assert_balance_non_negative(waqf: &WaqfProfile) {
    assert!(
        waqf.financial.current_balance >= Decimal::ZERO,
        "INV-1 violated: waqf {} has negative balance ({})",
        waqf.id,
        waqf.financial.current_balance
    );
}

/// INV-2: A return debits exactly the tranche amount, floored at zero.
pub fn assert_return_debit(balance_before: Decimal, balance_after: Decimal, amount: Decimal) {
    assert_eq!(
        balance_after,
        (balance_before - amount).max(Decimal::ZERO),
        "INV-2 violated: {} - {} floored at 0 != {}",
        balance_before,
        amount,
        balance_after
    );
}

/// INV-3: `isReturned` is monotonic, and `returnedDate` never changes once set.
pub fn assert_returns_monotonic(before: &WaqfProfile, after: &WaqfProfile) {
    for old in before.tranches() {
        let new = after
            .tranches()
            .iter()
            .find(|t| t.id == old.id)
            .unwrap_or_else(|| panic!("INV-3 violated: tranche {} disappeared", old.id));
        if old.is_returned {
            assert!(new.is_returned, "INV-3 violated: tranche {} un-returned", old.id);
            assert_eq!(
                old.returned_date, new.returned_date,
                "INV-3 violated: tranche {} returnedDate changed",
                old.id
            );
        }
    }
}

/// INV-4: Tranches keep insertion order; new tranches are only appended.
pub fn assert_insertion_order_preserved(before: &WaqfProfile, after: &WaqfProfile) {
    let old: Vec<_> = before.tranches().iter().map(|t| t.id.as_str()).collect();
    let new: Vec<_> = after.tranches().iter().map(|t| t.id.as_str()).collect();
    assert!(
        new.starts_with(&old),
        "INV-4 violated: tranche order changed from {:?} to {:?}",
        old,
        new
    );
}

/// INV-5: Buckets partition the tranches and each bucket sum matches its members.
pub fn assert_buckets_consistent(balance: &RevolvingWaqfBalance, tranche_count: usize) {
    assert_eq!(
        balance.tranche_count(),
        tranche_count,
        "INV-5 violated: buckets hold {} tranches, waqf has {}",
        balance.tranche_count(),
        tranche_count
    );

    let buckets = [
        (TrancheState::Locked, &balance.locked_tranches, balance.locked_balance),
        (TrancheState::Matured, &balance.matured_tranches, balance.matured_balance),
        (TrancheState::Returned, &balance.returned_tranches, balance.returned_balance),
    ];
    for (state, members, total) in buckets {
        assert!(
            members.iter().all(|t| t.status == state),
            "INV-5 violated: {:?} bucket holds a foreign tranche",
            state
        );
        let sum = members
            .iter()
            .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.amount));
        assert_eq!(sum, total, "INV-5 violated: {:?} sum {} != {}", state, sum, total);
    }
}

/// Run all stateless waqf invariants.
pub fn assert_all_waqf_invariants(waqf: &WaqfProfile) {
    assert_balance_non_negative(waqf);
    assert!(waqf.validate().is_ok(), "waqf {} fails validation", waqf.id);
}
