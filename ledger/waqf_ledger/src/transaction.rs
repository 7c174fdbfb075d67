//! In-memory halves of the mutating ledger operations.
//!
//! Each `apply_*` function validates and mutates a decoded [`WaqfProfile`]
//! without touching the store. The caller persists the result under the version
//! token it loaded, so a failed validation never reaches the store and a lost
//! race never leaves a partial write.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::{LedgerError, Result};
use crate::maturity::{compute_maturity_date, days_until, format_date};
use crate::store::VersionToken;
use crate::timestamp::{NanoTimestamp, Timestamp};
use crate::types::{
    ContributionTranche, ConversionDetails, FinancialMetrics, RevolvingDetails, TrancheLifecycle,
    WaqfProfile, WaqfStatus, WaqfType, MAX_LOCK_PERIOD_MONTHS, MIN_LOCK_PERIOD_MONTHS,
};

/// Document fields a converted waqf inherits from its source waqf.
const INHERITED_FIELDS: [&str; 7] = [
    "donor",
    "selectedCauses",
    "causeAllocation",
    "supportedCauses",
    "reportingPreferences",
    "notifications",
    "createdBy",
];

/// Result of a successful in-memory return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOutcome {
    pub amount: Decimal,
    pub returned_date: NanoTimestamp,
    pub new_balance: Decimal,
}

/// Result of a successful in-memory rollover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloverOutcome {
    pub new_tranche_id: String,
    pub amount: Decimal,
    pub new_maturity_date: NanoTimestamp,
}

/// What a persisted return reports to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnReceipt {
    pub waqf_id: String,
    pub tranche_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub returned_date: NanoTimestamp,
    #[serde(with = "rust_decimal::serde::float")]
    pub new_balance: Decimal,
    pub version: VersionToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloverReceipt {
    pub waqf_id: String,
    pub tranche_id: String,
    pub new_tranche_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub new_maturity_date: NanoTimestamp,
    pub version: VersionToken,
}

/// The kind of waqf a matured tranche is converted into, with the settings the
/// new waqf needs. Decodes from `{"targetWaqfType": "permanent", ...}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "targetWaqfType")]
pub enum ConversionTarget {
    #[serde(rename = "permanent")]
    Permanent {
        #[serde(default, rename = "investmentStrategy")]
        investment_strategy: Option<Map<String, Value>>,
    },
    #[serde(rename = "temporary_consumable")]
    Consumable {
        #[serde(rename = "consumableDetails")]
        consumable_details: Map<String, Value>,
    },
}

impl ConversionTarget {
    pub fn waqf_type(&self) -> WaqfType {
        match self {
            Self::Permanent { .. } => WaqfType::Permanent,
            Self::Consumable { .. } => WaqfType::TemporaryConsumable,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Permanent { .. } => "permanent",
            Self::Consumable { .. } => "consumable",
        }
    }
}

/// Result of a successful in-memory conversion. `new_waqf` still has to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutcome {
    pub new_waqf: WaqfProfile,
    pub amount: Decimal,
    pub converted_at: NanoTimestamp,
    pub new_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReceipt {
    pub waqf_id: String,
    pub tranche_id: String,
    pub new_waqf_id: String,
    pub target_waqf_type: WaqfType,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub converted_at: NanoTimestamp,
    #[serde(with = "rust_decimal::serde::float")]
    pub new_balance: Decimal,
    pub version: VersionToken,
}

fn revolving_details_mut<'a>(
    waqf_type: WaqfType,
    details: &'a mut Option<RevolvingDetails>,
    waqf_key: &str,
) -> Result<&'a mut RevolvingDetails> {
    match (waqf_type, details) {
        (WaqfType::TemporaryRevolving, Some(details)) => Ok(details),
        _ => Err(LedgerError::InvalidWaqfType(waqf_key.to_string())),
    }
}

fn find_tranche_mut<'a>(
    details: &'a mut RevolvingDetails,
    tranche_id: &str,
) -> Result<&'a mut ContributionTranche> {
    details
        .contribution_tranches
        .as_mut()
        .and_then(|tranches| tranches.iter_mut().find(|t| t.id == tranche_id))
        .ok_or_else(|| LedgerError::TrancheNotFound(tranche_id.to_string()))
}

/// Reject tranches that already left the waqf, or have not matured.
fn ensure_returnable(tranche: &ContributionTranche, now: Timestamp) -> Result<()> {
    if tranche.is_returned
        || tranche.conversion_details.is_some()
        || tranche.status.is_some_and(TrancheLifecycle::is_settling)
    {
        return Err(LedgerError::AlreadyReturned(tranche.id.clone()));
    }

    let maturity = tranche.maturity_date.to_timestamp();
    if now < maturity {
        return Err(LedgerError::NotMatured {
            tranche_id: tranche.id.clone(),
            days_remaining: days_until(maturity, now),
        });
    }
    Ok(())
}

/// Mark `tranche_id` returned and debit its amount from the current balance,
/// floored at zero.
pub fn apply_return(
    waqf: &mut WaqfProfile,
    waqf_key: &str,
    tranche_id: &str,
    now: Timestamp,
) -> Result<ReturnOutcome> {
    let details = revolving_details_mut(waqf.waqf_type, &mut waqf.revolving_details, waqf_key)?;
    let tranche = find_tranche_mut(details, tranche_id)?;
    ensure_returnable(tranche, now)?;

    let returned_date = NanoTimestamp::from_timestamp(now);
    tranche.is_returned = true;
    tranche.returned_date = Some(returned_date);
    tranche.status = Some(TrancheLifecycle::Returned);
    tranche.rollover_target_id = None;
    let amount = tranche.amount;

    let balance = &mut waqf.financial.current_balance;
    *balance = (*balance - amount).max(Decimal::ZERO);
    let new_balance = *balance;

    details.notify(format!("Tranche {tranche_id} returned with payout {amount:.2}."));

    Ok(ReturnOutcome {
        amount,
        returned_date,
        new_balance,
    })
}

/// Close a matured tranche and re-lock its principal in a new tranche for
/// `months` calendar months. The current balance is unchanged.
pub fn apply_rollover(
    waqf: &mut WaqfProfile,
    waqf_key: &str,
    tranche_id: &str,
    months: u32,
    target_cause_id: Option<&str>,
    now: Timestamp,
) -> Result<RolloverOutcome> {
    let details = revolving_details_mut(waqf.waqf_type, &mut waqf.revolving_details, waqf_key)?;
    let tranche = find_tranche_mut(details, tranche_id)?;
    ensure_returnable(tranche, now)?;

    if !(MIN_LOCK_PERIOD_MONTHS..=MAX_LOCK_PERIOD_MONTHS).contains(&months) {
        return Err(LedgerError::InvalidRolloverPeriod(months));
    }
    let new_maturity = compute_maturity_date(months, now)
        .map(NanoTimestamp::from_timestamp)
        .ok_or(LedgerError::InvalidRolloverPeriod(months))?;

    let stamp = NanoTimestamp::from_timestamp(now);
    let new_tranche_id = format!("tranche_rollover_{tranche_id}_{stamp}");

    tranche.is_returned = true;
    tranche.returned_date = Some(stamp);
    tranche.status = Some(TrancheLifecycle::RolledOver);
    tranche.rollover_target_id = Some(new_tranche_id.clone());
    let amount = tranche.amount;

    let mut successor = ContributionTranche::new_locked(&new_tranche_id, amount, stamp, new_maturity);
    successor.rollover_origin_id = Some(tranche_id.to_string());
    details
        .contribution_tranches
        .get_or_insert_with(Vec::new)
        .push(successor);

    let target = target_cause_id
        .map(|cause| format!(" (target cause: {cause})"))
        .unwrap_or_default();
    details.notify(format!(
        "Tranche {tranche_id} rolled over for {months} months into {new_tranche_id}{target}."
    ));

    Ok(RolloverOutcome {
        new_tranche_id,
        amount,
        new_maturity_date: new_maturity,
    })
}

/// Close a matured tranche by moving its principal into a new permanent or
/// consumable waqf. The tranche is marked returned with `conversionDetails` and
/// its amount is debited from the current balance, floored at zero.
pub fn apply_conversion(
    waqf: &mut WaqfProfile,
    waqf_key: &str,
    tranche_id: &str,
    target: &ConversionTarget,
    now: Timestamp,
) -> Result<ConversionOutcome> {
    let details = revolving_details_mut(waqf.waqf_type, &mut waqf.revolving_details, waqf_key)?;
    let tranche = find_tranche_mut(details, tranche_id)?;
    ensure_returnable(tranche, now)?;

    let stamp = NanoTimestamp::from_timestamp(now);
    let new_waqf_id = format!("waqf_converted_{tranche_id}_{stamp}");

    tranche.is_returned = true;
    tranche.returned_date = Some(stamp);
    tranche.status = Some(TrancheLifecycle::Returned);
    tranche.rollover_target_id = None;
    tranche.conversion_details = Some(ConversionDetails {
        converted_at: stamp,
        new_waqf_id: new_waqf_id.clone(),
        target_waqf_type: target.waqf_type(),
        notes: Some(format!("Converted to {} waqf", target.label())),
        extra: Map::new(),
    });
    let amount = tranche.amount;

    details.notify(format!(
        "Tranche {tranche_id} ({amount}) converted to {} waqf: {new_waqf_id}",
        target.label()
    ));

    let balance = &mut waqf.financial.current_balance;
    *balance = (*balance - amount).max(Decimal::ZERO);
    let new_balance = *balance;

    Ok(ConversionOutcome {
        new_waqf: converted_waqf(&waqf.extra, new_waqf_id, amount, target, now),
        amount,
        converted_at: stamp,
        new_balance,
    })
}

fn converted_waqf(
    source: &Map<String, Value>,
    id: String,
    amount: Decimal,
    target: &ConversionTarget,
    now: Timestamp,
) -> WaqfProfile {
    let mut extra: Map<String, Value> = INHERITED_FIELDS
        .iter()
        .filter_map(|field| source.get(*field).map(|v| (field.to_string(), v.clone())))
        .collect();

    if let Some(name) = source.get("name").and_then(Value::as_str) {
        let suffix = match target {
            ConversionTarget::Permanent { .. } => "Permanent Conversion",
            ConversionTarget::Consumable { .. } => "Consumable Conversion",
        };
        extra.insert("name".into(), json!(format!("{name} - {suffix}")));
    }
    extra.insert(
        "description".into(),
        json!(format!("Converted from revolving waqf tranche on {}", format_date(now))),
    );
    extra.insert("waqfAsset".into(), json!(amount.to_f64()));
    extra.insert("isHybrid".into(), json!(false));
    extra.insert("waqfAssets".into(), json!([]));

    match target {
        ConversionTarget::Permanent { investment_strategy } => {
            let strategy = investment_strategy.clone().unwrap_or_else(|| {
                let mut default = Map::new();
                default.insert("assetAllocation".into(), json!("60% Sukuk, 40% Equity"));
                default.insert("expectedAnnualReturn".into(), json!(7.0));
                default.insert("distributionFrequency".into(), json!("quarterly"));
                default
            });
            extra.insert("investmentStrategy".into(), Value::Object(strategy));
        }
        ConversionTarget::Consumable { consumable_details } => {
            extra.insert(
                "consumableDetails".into(),
                Value::Object(consumable_details.clone()),
            );
        }
    }

    let mut financial_extra = Map::new();
    financial_extra.insert("totalDistributed".into(), json!(0));
    financial_extra.insert("investmentReturns".into(), json!([]));
    financial_extra.insert("totalInvestmentReturn".into(), json!(0));
    financial_extra.insert("growthRate".into(), json!(0));
    financial_extra.insert("causeAllocations".into(), json!({}));

    WaqfProfile {
        id,
        waqf_type: target.waqf_type(),
        financial: FinancialMetrics {
            total_donations: amount,
            current_balance: amount,
            extra: financial_extra,
        },
        revolving_details: None,
        created_at: now.to_datetime(),
        status: WaqfStatus::Active,
        extra,
    }
}
