//! Balance aggregator.
//!
//! Folds a waqf's tranches into locked / matured / returned buckets. Pure: the
//! result depends only on the document and `now`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::status::{classify, TrancheState, TrancheStatus};
use crate::timestamp::{NanoTimestamp, Timestamp};
use crate::types::{ContributionTranche, WaqfProfile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevolvingWaqfBalance {
    /// Ledger total, not a sum over tranches.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_principal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub locked_balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub matured_balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub returned_balance: Decimal,
    pub locked_tranches: Vec<TrancheStatus>,
    pub matured_tranches: Vec<TrancheStatus>,
    pub returned_tranches: Vec<TrancheStatus>,
    pub next_maturity_date: Option<NanoTimestamp>,
    #[serde(with = "rust_decimal::serde::float")]
    pub next_maturity_amount: Decimal,
}

impl RevolvingWaqfBalance {
    pub fn tranche_count(&self) -> usize {
        self.locked_tranches.len() + self.matured_tranches.len() + self.returned_tranches.len()
    }
}

/// Bucket every tranche of `waqf` and pick the next one due.
///
/// A waqf with no tranche collection yields all-zero buckets.
pub fn calculate_balance(waqf: &WaqfProfile, now: Timestamp) -> RevolvingWaqfBalance {
    let mut locked = Vec::new();
    let mut matured = Vec::new();
    let mut returned = Vec::new();

    for status in waqf.tranches().iter().map(|t| classify(t, now)) {
        match status.status {
            TrancheState::Locked => locked.push(status),
            TrancheState::Matured => matured.push(status),
            TrancheState::Returned => returned.push(status),
        }
    }

    // Ties on the day count fall back to the exact instant, then insertion order.
    let next = locked
        .iter()
        .min_by_key(|t| (t.days_until_maturity, t.maturity_date));

    let balance = RevolvingWaqfBalance {
        total_principal: waqf.financial.total_donations,
        locked_balance: sum(&locked),
        matured_balance: sum(&matured),
        returned_balance: sum(&returned),
        next_maturity_date: next.map(|t| t.maturity_date),
        next_maturity_amount: next.map(|t| t.amount).unwrap_or(Decimal::ZERO),
        locked_tranches: locked,
        matured_tranches: matured,
        returned_tranches: returned,
    };

    debug!(
        waqf_id = %waqf.id,
        locked = %balance.locked_balance,
        matured = %balance.matured_balance,
        returned = %balance.returned_balance,
        "revolving balance computed"
    );
    balance
}

/// Saturates at `Decimal::MAX` instead of panicking on huge stored amounts.
fn sum(statuses: &[TrancheStatus]) -> Decimal {
    statuses
        .iter()
        .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.amount))
}

/// Classify every tranche, earliest maturity first. Stable for equal dates.
pub fn sorted_statuses(waqf: &WaqfProfile, now: Timestamp) -> Vec<TrancheStatus> {
    let statuses: Vec<_> = waqf.tranches().iter().map(|t| classify(t, now)).collect();
    sort_by_maturity(&statuses)
}

pub fn sort_by_maturity(statuses: &[TrancheStatus]) -> Vec<TrancheStatus> {
    let mut sorted = statuses.to_vec();
    sorted.sort_by_key(|t| t.maturity_date);
    sorted
}

/// Tranches that can be returned right now: matured, not returned, and with no
/// return or rollover already under way.
pub fn matured_tranches(waqf: &WaqfProfile, now: Timestamp) -> Vec<&ContributionTranche> {
    waqf.tranches()
        .iter()
        .filter(|t| !t.is_returned)
        .filter(|t| !t.status.is_some_and(|s| s.is_settling()))
        .filter(|t| now >= t.maturity_date.to_timestamp())
        .collect()
}

pub fn has_matured_tranches(waqf: &WaqfProfile, now: Timestamp) -> bool {
    !matured_tranches(waqf, now).is_empty()
}
