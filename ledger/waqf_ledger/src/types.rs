//! # Types
//!
//! The persisted waqf document, as the ledger sees it.
//!
//! ## Design decisions
//!
//! ### Partial schema, lossless round-trip
//!
//! A waqf document carries far more than the ledger needs (donor profile, cause
//! allocations, reporting preferences, ...). Each struct here names only the
//! fields the ledger reads or writes and keeps everything else in a flattened
//! `extra` map, so a read-modify-write never drops data owned by other parts of
//! the application.
//!
//! ### Validation at the boundary
//!
//! [`WaqfProfile::validate`] runs on every document loaded from the store.
//! Malformed documents are rejected there instead of reaching the arithmetic.
//!
//! ### Tranche lifecycle
//!
//! ```text
//! Locked ──► Matured ──► Returned
//!                ├─────► RolledOver
//!                └─────► Returned + conversionDetails (new waqf)
//! ```
//!
//! `isReturned` flips false → true once and never reverts. The optional stored
//! [`TrancheLifecycle`] records *how* the tranche left the waqf.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::timestamp::NanoTimestamp;

pub const MIN_LOCK_PERIOD_MONTHS: u32 = 1;
pub const MAX_LOCK_PERIOD_MONTHS: u32 = 240;

/// Kind of endowment. Only `TemporaryRevolving` carries tranche data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaqfType {
    Permanent,
    TemporaryConsumable,
    TemporaryRevolving,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaqfStatus {
    #[default]
    Active,
    Inactive,
    Paused,
    Completed,
    Terminated,
    Matured,
}

/// Stored lifecycle marker of a tranche.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrancheLifecycle {
    Locked,
    Matured,
    ReturnScheduled,
    Returned,
    RolledOver,
}

impl TrancheLifecycle {
    /// A return or rollover has already been initiated for the tranche.
    pub fn is_settling(self) -> bool {
        matches!(self, Self::ReturnScheduled | Self::RolledOver)
    }
}

/// Waqf ledger totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialMetrics {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_donations: Decimal,
    /// The only field a tranche return mutates.
    #[serde(with = "rust_decimal::serde::float")]
    pub current_balance: Decimal,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One separately-timed contribution into a revolving waqf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionTranche {
    pub id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub contribution_date: NanoTimestamp,
    pub maturity_date: NanoTimestamp,
    pub is_returned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_date: Option<NanoTimestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TrancheLifecycle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollover_origin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollover_target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_details: Option<ConversionDetails>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where a converted tranche's principal went.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionDetails {
    pub converted_at: NanoTimestamp,
    pub new_waqf_id: String,
    pub target_waqf_type: WaqfType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContributionTranche {
    pub fn new_locked(
        id: impl Into<String>,
        amount: Decimal,
        contribution_date: NanoTimestamp,
        maturity_date: NanoTimestamp,
    ) -> Self {
        Self {
            id: id.into(),
            amount,
            contribution_date,
            maturity_date,
            is_returned: false,
            returned_date: None,
            status: Some(TrancheLifecycle::Locked),
            rollover_origin_id: None,
            rollover_target_id: None,
            conversion_details: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevolvingDetails {
    pub lock_period_months: u32,
    /// Whole-waqf maturity, independent of per-tranche maturity.
    pub maturity_date: DateTime<Utc>,
    /// Insertion order is contribution order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contribution_tranches: Option<Vec<ContributionTranche>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_notifications: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RevolvingDetails {
    pub fn tranches(&self) -> &[ContributionTranche] {
        self.contribution_tranches.as_deref().unwrap_or(&[])
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.pending_notifications
            .get_or_insert_with(Vec::new)
            .push(message.into());
    }
}

/// Aggregate root: one per endowment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaqfProfile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub waqf_type: WaqfType,
    pub financial: FinancialMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revolving_details: Option<RevolvingDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: WaqfStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WaqfProfile {
    /// Revolving details, but only for waqfs of revolving type.
    pub fn revolving(&self) -> Option<&RevolvingDetails> {
        match self.waqf_type {
            WaqfType::TemporaryRevolving => self.revolving_details.as_ref(),
            _ => None,
        }
    }

    pub fn revolving_mut(&mut self) -> Option<&mut RevolvingDetails> {
        match self.waqf_type {
            WaqfType::TemporaryRevolving => self.revolving_details.as_mut(),
            _ => None,
        }
    }

    /// The endowed principal (`waqfAsset`), when the document carries a usable one.
    pub fn waqf_asset(&self) -> Option<Decimal> {
        self.extra
            .get("waqfAsset")
            .and_then(|v| rust_decimal::serde::float::deserialize(v).ok())
            .filter(|amount: &Decimal| !amount.is_sign_negative())
    }

    /// Tranches in insertion order; empty for non-revolving waqfs.
    pub fn tranches(&self) -> &[ContributionTranche] {
        self.revolving().map(RevolvingDetails::tranches).unwrap_or(&[])
    }

    /// Structural checks applied whenever a document crosses the store boundary.
    pub fn validate(&self) -> Result<(), String> {
        if self.financial.total_donations.is_sign_negative() {
            return Err("financial.totalDonations is negative".to_string());
        }
        if self.financial.current_balance.is_sign_negative() {
            return Err("financial.currentBalance is negative".to_string());
        }

        let details = match (self.waqf_type, &self.revolving_details) {
            (WaqfType::TemporaryRevolving, None) => {
                return Err("temporary_revolving waqf has no revolvingDetails".to_string())
            }
            (WaqfType::TemporaryRevolving, Some(details)) => details,
            _ => return Ok(()),
        };

        if !(MIN_LOCK_PERIOD_MONTHS..=MAX_LOCK_PERIOD_MONTHS).contains(&details.lock_period_months) {
            return Err(format!(
                "lockPeriodMonths {} outside {MIN_LOCK_PERIOD_MONTHS}..={MAX_LOCK_PERIOD_MONTHS}",
                details.lock_period_months
            ));
        }

        let mut seen = HashSet::new();
        for tranche in details.tranches() {
            if tranche.id.is_empty() {
                return Err("tranche with empty id".to_string());
            }
            if !seen.insert(tranche.id.as_str()) {
                return Err(format!("duplicate tranche id {}", tranche.id));
            }
            if tranche.amount <= Decimal::ZERO {
                return Err(format!("tranche {} has non-positive amount", tranche.id));
            }
            if tranche.returned_date.is_some() && !tranche.is_returned {
                return Err(format!(
                    "tranche {} has a returnedDate but is not returned",
                    tranche.id
                ));
            }
            if tranche.conversion_details.is_some() && !tranche.is_returned {
                return Err(format!("tranche {} is converted but not returned", tranche.id));
            }
        }
        Ok(())
    }
}
