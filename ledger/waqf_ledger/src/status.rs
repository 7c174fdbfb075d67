//! Tranche status classifier.
//!
//! The single source of truth for which bucket a tranche is in. Used by the
//! balance aggregator and by anything rendering tranche cards.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::maturity::{days_until, is_matured};
use crate::timestamp::{NanoTimestamp, Timestamp};
use crate::types::ContributionTranche;

/// Derived bucket of a tranche at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrancheState {
    Locked,
    Matured,
    Returned,
}

/// View record: the tranche's own fields plus what `now` says about them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrancheStatus {
    pub id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub contribution_date: NanoTimestamp,
    pub maturity_date: NanoTimestamp,
    pub is_matured: bool,
    pub is_returned: bool,
    pub days_until_maturity: i64,
    pub status: TrancheState,
}

/// Classify one tranche. First match wins: returned, then matured, then locked.
pub fn classify(tranche: &ContributionTranche, now: Timestamp) -> TrancheStatus {
    let maturity = tranche.maturity_date.to_timestamp();
    let matured = is_matured(maturity, now);

    let status = if tranche.is_returned {
        TrancheState::Returned
    } else if matured {
        TrancheState::Matured
    } else {
        TrancheState::Locked
    };

    TrancheStatus {
        id: tranche.id.clone(),
        amount: tranche.amount,
        contribution_date: tranche.contribution_date,
        maturity_date: tranche.maturity_date,
        is_matured: matured,
        is_returned: tranche.is_returned,
        days_until_maturity: days_until(maturity, now),
        status,
    }
}
