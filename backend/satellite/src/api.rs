//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use waqf_ledger::{
    ConversionReceipt, ConversionTarget, LedgerError, MaturitySummary, ReturnReceipt,
    RevolvingWaqfBalance, RolloverReceipt, TrancheLedger, TrancheStatus,
};

use crate::db::SqliteStore;
use crate::errors::Result;

pub type Ledger = TrancheLedger<SqliteStore>;

pub struct ApiState {
    pub ledger: Arc<Ledger>,
    /// Default look-ahead for `maturing-soon` queries.
    pub maturing_soon_days: i64,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/waqfs/matured", get(get_matured_waqfs))
        .route("/waqfs/maturing-soon", get(get_maturing_soon_waqfs))
        .route("/waqfs/:id/balance", get(get_balance))
        .route("/waqfs/:id/tranches", get(get_tranches))
        .route("/waqfs/:id/maturity", get(get_maturity))
        .route("/waqfs/:id/tranches/:tranche_id/return", post(return_tranche))
        .route("/waqfs/:id/tranches/:tranche_id/rollover", post(rollover_tranche))
        .route("/waqfs/:id/tranches/:tranche_id/convert", post(convert_tranche))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloverRequest {
    pub months: u32,
    pub target_cause_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaqfListResponse {
    pub count: usize,
    pub waqf_ids: Vec<String>,
}

impl From<Vec<String>> for WaqfListResponse {
    fn from(waqf_ids: Vec<String>) -> Self {
        Self {
            count: waqf_ids.len(),
            waqf_ids,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl ApiState {
    fn window(&self, query: &WindowQuery) -> i64 {
        query.days.unwrap_or(self.maturing_soon_days).max(0)
    }
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /waqfs/:id/balance`
pub async fn get_balance(
    State(state): State<Arc<ApiState>>,
    Path(waqf_id): Path<String>,
) -> Result<Json<RevolvingWaqfBalance>> {
    Ok(Json(state.ledger.balance(&waqf_id).await?))
}

/// `GET /waqfs/:id/tranches`
///
/// Every tranche with its derived state, earliest maturity first.
pub async fn get_tranches(
    State(state): State<Arc<ApiState>>,
    Path(waqf_id): Path<String>,
) -> Result<Json<Vec<TrancheStatus>>> {
    Ok(Json(state.ledger.tranche_statuses(&waqf_id).await?))
}

/// `GET /waqfs/:id/maturity?days=N`
pub async fn get_maturity(
    State(state): State<Arc<ApiState>>,
    Path(waqf_id): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<MaturitySummary>> {
    let days = state.window(&query);
    match state.ledger.maturity_summary(&waqf_id, days).await? {
        Some(summary) => Ok(Json(summary)),
        None => Err(LedgerError::InvalidWaqfType(waqf_id).into()),
    }
}

/// `POST /waqfs/:id/tranches/:tranche_id/return`
pub async fn return_tranche(
    State(state): State<Arc<ApiState>>,
    Path((waqf_id, tranche_id)): Path<(String, String)>,
) -> Result<Json<ReturnReceipt>> {
    Ok(Json(state.ledger.return_tranche(&waqf_id, &tranche_id).await?))
}

/// `POST /waqfs/:id/tranches/:tranche_id/rollover`
pub async fn rollover_tranche(
    State(state): State<Arc<ApiState>>,
    Path((waqf_id, tranche_id)): Path<(String, String)>,
    Json(request): Json<RolloverRequest>,
) -> Result<Json<RolloverReceipt>> {
    let receipt = state
        .ledger
        .rollover_tranche(
            &waqf_id,
            &tranche_id,
            request.months,
            request.target_cause_id.as_deref(),
        )
        .await?;
    Ok(Json(receipt))
}

/// `POST /waqfs/:id/tranches/:tranche_id/convert`
///
/// Moves a matured tranche into a new permanent or consumable waqf.
pub async fn convert_tranche(
    State(state): State<Arc<ApiState>>,
    Path((waqf_id, tranche_id)): Path<(String, String)>,
    Json(target): Json<ConversionTarget>,
) -> Result<Json<ConversionReceipt>> {
    let receipt = state
        .ledger
        .convert_tranche(&waqf_id, &tranche_id, &target)
        .await?;
    Ok(Json(receipt))
}

/// `GET /waqfs/matured`
///
/// Revolving waqfs past their maturity date that are still active.
pub async fn get_matured_waqfs(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<WaqfListResponse>> {
    let report = state.ledger.scan(state.maturing_soon_days).await?;
    Ok(Json(report.matured.into()))
}

/// `GET /waqfs/maturing-soon?days=N`
pub async fn get_maturing_soon_waqfs(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<WaqfListResponse>> {
    let report = state.ledger.scan(state.window(&query)).await?;
    Ok(Json(report.maturing_soon.into()))
}
