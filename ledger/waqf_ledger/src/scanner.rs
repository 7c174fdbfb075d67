//! Matured-waqf scanner.
//!
//! Read-only filters over whole-waqf maturity (`revolvingDetails.maturityDate`).
//! They only identify candidates; status transitions and notification
//! dispatch belong to the caller.

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::maturity::{format_date, human_remaining, is_matured, maturity_progress};
use crate::timestamp::Timestamp;
use crate::types::{WaqfProfile, WaqfStatus};

pub const DEFAULT_MATURING_SOON_DAYS: i64 = 30;

fn whole_waqf_maturity(waqf: &WaqfProfile) -> Option<Timestamp> {
    waqf.revolving()
        .map(|details| Timestamp::from_datetime(details.maturity_date))
}

/// Revolving waqfs past their maturity date that are still `active`.
pub fn matured_waqfs<'a, I>(waqfs: I, now: Timestamp) -> Vec<&'a WaqfProfile>
where
    I: IntoIterator<Item = &'a WaqfProfile>,
{
    waqfs
        .into_iter()
        .filter(|waqf| waqf.status == WaqfStatus::Active)
        .filter(|waqf| whole_waqf_maturity(waqf).is_some_and(|m| is_matured(m, now)))
        .collect()
}

/// Active revolving waqfs maturing in `(now, now + days]`.
pub fn maturing_soon<'a, I>(waqfs: I, now: Timestamp, days: i64) -> Vec<&'a WaqfProfile>
where
    I: IntoIterator<Item = &'a WaqfProfile>,
{
    let threshold = now.add_days(days);
    waqfs
        .into_iter()
        .filter(|waqf| waqf.status == WaqfStatus::Active)
        .filter(|waqf| {
            whole_waqf_maturity(waqf).is_some_and(|m| m > now && m <= threshold)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaturityPhase {
    Locked,
    MaturingSoon,
    Matured,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaturitySummary {
    pub status: MaturityPhase,
    pub time_remaining: String,
    pub progress: f64,
    #[serde(with = "rust_decimal::serde::float")]
    pub principal_amount: Decimal,
    pub maturity_date: DateTime<Utc>,
    pub formatted_maturity_date: String,
}

/// Whole-waqf maturity overview; `None` for non-revolving waqfs.
///
/// Only an active waqf can be maturing soon; others stay locked until maturity.
/// The principal is the endowed `waqfAsset`, or total donations when absent.
///
/// Progress runs from `createdAt`, or from one lock period before maturity
/// when the creation date is missing.
pub fn maturity_summary(waqf: &WaqfProfile, now: Timestamp, soon_days: i64) -> Option<MaturitySummary> {
    let details = waqf.revolving()?;
    let maturity = Timestamp::from_datetime(details.maturity_date);
    let start = waqf
        .created_at
        .or_else(|| {
            details
                .maturity_date
                .checked_sub_months(Months::new(details.lock_period_months))
        })
        .map(Timestamp::from_datetime)
        .unwrap_or(maturity);

    let status = if is_matured(maturity, now) {
        MaturityPhase::Matured
    } else if !maturing_soon([waqf], now, soon_days).is_empty() {
        MaturityPhase::MaturingSoon
    } else {
        MaturityPhase::Locked
    };

    Some(MaturitySummary {
        status,
        time_remaining: human_remaining(maturity, now),
        progress: maturity_progress(start, maturity, now),
        principal_amount: waqf.waqf_asset().unwrap_or(waqf.financial.total_donations),
        maturity_date: details.maturity_date,
        formatted_maturity_date: format_date(maturity),
    })
}

/// Waqf ids flagged by one pass over a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub matured: Vec<String>,
    pub maturing_soon: Vec<String>,
}

pub fn scan<'a, I>(waqfs: I, now: Timestamp, soon_days: i64) -> ScanReport
where
    I: IntoIterator<Item = &'a WaqfProfile> + Clone,
{
    ScanReport {
        matured: ids(matured_waqfs(waqfs.clone(), now)),
        maturing_soon: ids(maturing_soon(waqfs, now, soon_days)),
    }
}

fn ids(found: Vec<&WaqfProfile>) -> Vec<String> {
    found.into_iter().map(|w| w.id.clone()).collect()
}
