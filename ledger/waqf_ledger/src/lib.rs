//! # Waqf Tranche Ledger
//!
//! Maturity accounting for revolving waqfs: a revolving waqf locks each donor
//! contribution ("tranche") until its maturity date, then returns the principal
//! exactly once.
//!
//! | Concern          | Entry point(s)                                              |
//! |------------------|-------------------------------------------------------------|
//! | Queries          | [`TrancheLedger::load`], `balance`, `tranche_statuses`      |
//! | Return           | [`TrancheLedger::return_tranche`]                           |
//! | Rollover         | [`TrancheLedger::rollover_tranche`]                         |
//! | Conversion       | [`TrancheLedger::convert_tranche`]                          |
//! | Maturity sweeps  | [`TrancheLedger::scan`]                                     |
//!
//! ## Architecture
//!
//! Pure computation lives in [`maturity`], [`status`], [`balance`] and
//! [`scanner`]. Mutations are split into an in-memory half ([`transaction`])
//! and a persistence half ([`storage`]) over the [`DocumentStore`] trait. This
//! file only wires them together and logs outcomes.
//!
//! Every mutation is a read-modify-write guarded by the document's
//! [`VersionToken`]. A lost race surfaces as
//! [`LedgerError::ConcurrentModification`]; the ledger never retries on its own.

use tracing::{error, info, warn};

pub mod balance;
pub mod errors;
pub mod maturity;
pub mod scanner;
pub mod status;
pub mod storage;
pub mod store;
pub mod timestamp;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_balance;
#[cfg(test)]
mod test_rollover;

pub use balance::RevolvingWaqfBalance;
pub use errors::{LedgerError, Result, StoreError};
pub use scanner::{MaturitySummary, ScanReport};
pub use status::{TrancheState, TrancheStatus};
pub use storage::StoredWaqf;
pub use store::{Document, DocumentStore, MemoryStore, VersionToken};
pub use timestamp::{Clock, ManualClock, NanoTimestamp, SystemClock, Timestamp};
pub use transaction::{ConversionReceipt, ConversionTarget, ReturnReceipt, RolloverReceipt};
pub use types::{ContributionTranche, ConversionDetails, WaqfProfile, WaqfStatus, WaqfType};

pub const DEFAULT_COLLECTION: &str = "waqfs";

/// The tranche ledger bound to one store collection and one clock.
#[derive(Debug)]
pub struct TrancheLedger<S, C = SystemClock> {
    store: S,
    clock: C,
    collection: String,
}

impl<S: DocumentStore> TrancheLedger<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: DocumentStore, C: Clock> TrancheLedger<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    pub fn in_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    pub async fn load(&self, waqf_id: &str) -> Result<StoredWaqf> {
        storage::load_waqf(&self.store, &self.collection, waqf_id).await
    }

    pub async fn create(&self, waqf_id: &str, waqf: &WaqfProfile) -> Result<VersionToken> {
        storage::create_waqf(&self.store, &self.collection, waqf_id, waqf).await
    }

    /// Locked / matured / returned breakdown of one waqf.
    pub async fn balance(&self, waqf_id: &str) -> Result<RevolvingWaqfBalance> {
        let stored = self.load(waqf_id).await?;
        Ok(balance::calculate_balance(&stored.waqf, self.clock.now()))
    }

    /// Every tranche of one waqf, earliest maturity first.
    pub async fn tranche_statuses(&self, waqf_id: &str) -> Result<Vec<TrancheStatus>> {
        let stored = self.load(waqf_id).await?;
        Ok(balance::sorted_statuses(&stored.waqf, self.clock.now()))
    }

    pub async fn maturity_summary(
        &self,
        waqf_id: &str,
        soon_days: i64,
    ) -> Result<Option<MaturitySummary>> {
        let stored = self.load(waqf_id).await?;
        Ok(scanner::maturity_summary(
            &stored.waqf,
            self.clock.now(),
            soon_days,
        ))
    }

    /// Matured-but-active and maturing-soon waqfs across the collection.
    pub async fn scan(&self, soon_days: i64) -> Result<ScanReport> {
        let waqfs = storage::list_waqfs(&self.store, &self.collection).await?;
        let profiles: Vec<&WaqfProfile> = waqfs.iter().map(|s| &s.waqf).collect();
        Ok(scanner::scan(
            profiles.iter().copied(),
            self.clock.now(),
            soon_days,
        ))
    }

    // ─────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────

    /// Return a matured tranche to its donor.
    ///
    /// Loads the waqf, checks that it is revolving, that the tranche exists,
    /// is not yet returned and has matured, then marks it returned, debits
    /// `financial.currentBalance` (floored at zero) and writes the document back
    /// under the version token it was read with.
    ///
    /// A second call for the same tranche fails with
    /// [`LedgerError::AlreadyReturned`]. A concurrent write to the same waqf
    /// between the load and the store fails with
    /// [`LedgerError::ConcurrentModification`]; re-fetch and retry from the top.
    pub async fn return_tranche(&self, waqf_id: &str, tranche_id: &str) -> Result<ReturnReceipt> {
        info!("Returning tranche {tranche_id} of waqf {waqf_id}");

        let result = self.try_return(waqf_id, tranche_id).await;
        match &result {
            Ok(receipt) => info!(
                waqf_id,
                tranche_id,
                amount = %receipt.amount,
                new_balance = %receipt.new_balance,
                "Tranche returned"
            ),
            Err(e) => warn!(waqf_id, tranche_id, kind = e.kind(), "Tranche return rejected: {e}"),
        }
        result
    }

    async fn try_return(&self, waqf_id: &str, tranche_id: &str) -> Result<ReturnReceipt> {
        let mut stored = self.load(waqf_id).await?;
        let outcome =
            transaction::apply_return(&mut stored.waqf, waqf_id, tranche_id, self.clock.now())?;
        let version = storage::save_waqf(&self.store, &self.collection, &stored).await?;

        Ok(ReturnReceipt {
            waqf_id: waqf_id.to_string(),
            tranche_id: tranche_id.to_string(),
            amount: outcome.amount,
            returned_date: outcome.returned_date,
            new_balance: outcome.new_balance,
            version,
        })
    }

    /// Close a matured tranche and re-lock its principal for `months` more
    /// calendar months in a new tranche. Same guards as
    /// [`return_tranche`](Self::return_tranche); the balance is untouched.
    pub async fn rollover_tranche(
        &self,
        waqf_id: &str,
        tranche_id: &str,
        months: u32,
        target_cause_id: Option<&str>,
    ) -> Result<RolloverReceipt> {
        info!("Rolling over tranche {tranche_id} of waqf {waqf_id} for {months} months");

        let result = self
            .try_rollover(waqf_id, tranche_id, months, target_cause_id)
            .await;
        match &result {
            Ok(receipt) => info!(
                waqf_id,
                tranche_id,
                new_tranche_id = %receipt.new_tranche_id,
                "Tranche rolled over"
            ),
            Err(e) => warn!(waqf_id, tranche_id, kind = e.kind(), "Tranche rollover rejected: {e}"),
        }
        result
    }

    async fn try_rollover(
        &self,
        waqf_id: &str,
        tranche_id: &str,
        months: u32,
        target_cause_id: Option<&str>,
    ) -> Result<RolloverReceipt> {
        let mut stored = self.load(waqf_id).await?;
        let outcome = transaction::apply_rollover(
            &mut stored.waqf,
            waqf_id,
            tranche_id,
            months,
            target_cause_id,
            self.clock.now(),
        )?;
        let version = storage::save_waqf(&self.store, &self.collection, &stored).await?;

        Ok(RolloverReceipt {
            waqf_id: waqf_id.to_string(),
            tranche_id: tranche_id.to_string(),
            new_tranche_id: outcome.new_tranche_id,
            amount: outcome.amount,
            new_maturity_date: outcome.new_maturity_date,
            version,
        })
    }

    /// Close a matured tranche by moving its principal into a new permanent or
    /// consumable waqf in the same collection. Same guards as
    /// [`return_tranche`](Self::return_tranche), and the same balance debit.
    ///
    /// The source waqf is written first, under its version token, so a lost race
    /// creates nothing. The new waqf is created afterwards; if that create fails
    /// the tranche stays converted and the error names the missing waqf.
    pub async fn convert_tranche(
        &self,
        waqf_id: &str,
        tranche_id: &str,
        target: &ConversionTarget,
    ) -> Result<ConversionReceipt> {
        info!(
            "Converting tranche {tranche_id} of waqf {waqf_id} to {:?}",
            target.waqf_type()
        );

        let result = self.try_convert(waqf_id, tranche_id, target).await;
        match &result {
            Ok(receipt) => info!(
                waqf_id,
                tranche_id,
                new_waqf_id = %receipt.new_waqf_id,
                amount = %receipt.amount,
                new_balance = %receipt.new_balance,
                "Tranche converted"
            ),
            Err(e) => warn!(waqf_id, tranche_id, kind = e.kind(), "Tranche conversion rejected: {e}"),
        }
        result
    }

    async fn try_convert(
        &self,
        waqf_id: &str,
        tranche_id: &str,
        target: &ConversionTarget,
    ) -> Result<ConversionReceipt> {
        let mut stored = self.load(waqf_id).await?;
        let outcome = transaction::apply_conversion(
            &mut stored.waqf,
            waqf_id,
            tranche_id,
            target,
            self.clock.now(),
        )?;
        let version = storage::save_waqf(&self.store, &self.collection, &stored).await?;

        let new_waqf_id = outcome.new_waqf.id.clone();
        if let Err(e) =
            storage::create_waqf(&self.store, &self.collection, &new_waqf_id, &outcome.new_waqf).await
        {
            error!(waqf_id, tranche_id, new_waqf_id = %new_waqf_id, "Converted waqf was not created: {e}");
            return Err(e);
        }

        Ok(ConversionReceipt {
            waqf_id: waqf_id.to_string(),
            tranche_id: tranche_id.to_string(),
            new_waqf_id,
            target_waqf_type: target.waqf_type(),
            amount: outcome.amount,
            converted_at: outcome.converted_at,
            new_balance: outcome.new_balance,
            version,
        })
    }
}
