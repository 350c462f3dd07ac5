//! Transfer handlers: internal ledger transfers and external settlements

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, ok};
use crate::core_types::{AccountId, Currency};
use crate::money;
use crate::settlement::{AttemptId, SettlementState};

/// Internal transfer request
#[derive(Debug, Deserialize, ToSchema)]
pub struct InternalTransferRequest {
    /// Receiver lookup key
    #[schema(example = "receiver@example.com")]
    pub receiver_email: String,
    /// Decimal amount string, e.g. "12.50"
    #[schema(example = "12.50")]
    pub amount: String,
}

/// Internal transfer response
#[derive(Debug, Serialize, ToSchema)]
pub struct InternalTransferResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<i64>,
    /// COMPLETED, or PENDING_REVIEW for outcomes under reconciliation
    #[schema(example = "COMPLETED")]
    pub status: String,
    #[schema(example = "12.50")]
    pub amount: String,
    /// Sender balance after the transfer
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "87.50")]
    pub balance: Option<String>,
}

/// Create internal transfer endpoint
///
/// POST /api/v1/transfers/internal
#[utoipa::path(
    post,
    path = "/api/v1/transfers/internal",
    request_body = InternalTransferRequest,
    responses(
        (status = 200, description = "Transfer completed", body = InternalTransferResponse, content_type = "application/json"),
        (status = 400, description = "Invalid parameters"),
        (status = 401, description = "Authentication failed"),
        (status = 404, description = "Receiver not found"),
        (status = 422, description = "Insufficient funds or currency mismatch")
    ),
    security(("session_jwt" = [])),
    tag = "Transfer"
)]
pub async fn internal_transfer(
    State(state): State<Arc<AppState>>,
    Extension(account_id): Extension<AccountId>,
    Json(req): Json<InternalTransferRequest>,
) -> ApiResult<InternalTransferResponse> {
    let decimals = Currency::Usdc.decimals();
    let amount = money::parse_amount(&req.amount, decimals)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    match state
        .internal
        .transfer(account_id, &req.receiver_email, amount)
        .await
    {
        Ok(outcome) => ok(InternalTransferResponse {
            record_id: Some(outcome.record_id),
            status: "COMPLETED".to_string(),
            amount: money::format_amount(outcome.amount, decimals),
            balance: Some(money::format_amount(outcome.sender_balance, decimals)),
        }),
        // Unsafe outcome: the caller sees a neutral pending result while the
        // alert path carries the diagnostics.
        Err(e) if e.is_reconciliation_required() => ok(InternalTransferResponse {
            record_id: None,
            status: "PENDING_REVIEW".to_string(),
            amount: money::format_amount(amount, decimals),
            balance: None,
        }),
        Err(e) => ApiError::from(e).into_err(),
    }
}

/// External transfer request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExternalTransferRequest {
    /// Destination chain address
    #[schema(example = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin")]
    pub destination: String,
    /// Decimal amount string, e.g. "50"
    #[schema(example = "50")]
    pub amount: String,
    /// Client idempotency key: retries with the same cid never submit a
    /// second chain transfer
    pub cid: Option<String>,
}

/// External transfer / settlement attempt response
#[derive(Debug, Serialize, ToSchema)]
pub struct ExternalTransferResponse {
    pub attempt_id: String,
    /// COMPLETED | PENDING_REVIEW | FAILED | processing states
    #[schema(example = "COMPLETED")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_signature: Option<String>,
}

/// Caller-facing status string. Unsafe outcomes render as the neutral
/// pending status; diagnostic context stays internal.
fn status_label(state: SettlementState) -> String {
    match state {
        SettlementState::Committed => "COMPLETED".to_string(),
        SettlementState::ReconciliationRequired => "PENDING_REVIEW".to_string(),
        SettlementState::Failed => "FAILED".to_string(),
        other => other.as_str().to_string(),
    }
}

/// Create external transfer endpoint
///
/// POST /api/v1/transfers/external
#[utoipa::path(
    post,
    path = "/api/v1/transfers/external",
    request_body = ExternalTransferRequest,
    responses(
        (status = 200, description = "Settlement completed or pending review", body = ExternalTransferResponse, content_type = "application/json"),
        (status = 400, description = "Invalid parameters or destination"),
        (status = 401, description = "Authentication failed"),
        (status = 422, description = "Insufficient funds or destination account missing"),
        (status = 502, description = "Chain submission failed")
    ),
    security(("session_jwt" = [])),
    tag = "Transfer"
)]
pub async fn external_transfer(
    State(state): State<Arc<AppState>>,
    Extension(account_id): Extension<AccountId>,
    Json(req): Json<ExternalTransferRequest>,
) -> ApiResult<ExternalTransferResponse> {
    let amount = money::parse_amount(&req.amount, Currency::Usdc.decimals())
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let result = state
        .external
        .transfer(account_id, &req.destination, amount, req.cid)
        .await
        .map_err(ApiError::from)?;

    ok(ExternalTransferResponse {
        attempt_id: result.attempt_id.to_string(),
        status: status_label(result.state),
        tx_signature: result.tx_signature,
    })
}

/// Get settlement attempt status endpoint
///
/// GET /api/v1/transfers/external/{attempt_id}
#[utoipa::path(
    get,
    path = "/api/v1/transfers/external/{attempt_id}",
    params(
        ("attempt_id" = String, Path, description = "Settlement attempt id (ULID format)")
    ),
    responses(
        (status = 200, description = "Attempt status", body = ExternalTransferResponse, content_type = "application/json"),
        (status = 400, description = "Invalid attempt id format"),
        (status = 404, description = "Attempt not found")
    ),
    security(("session_jwt" = [])),
    tag = "Transfer"
)]
pub async fn get_external_transfer(
    State(state): State<Arc<AppState>>,
    Extension(account_id): Extension<AccountId>,
    Path(attempt_id_str): Path<String>,
) -> ApiResult<ExternalTransferResponse> {
    let attempt_id: AttemptId = attempt_id_str
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid attempt id format"))?;

    let attempt = state
        .external
        .status(attempt_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Settlement attempt not found"))?;

    // Attempts are scoped to their owner.
    if attempt.account_id != account_id {
        return ApiError::not_found("Settlement attempt not found").into_err();
    }

    ok(ExternalTransferResponse {
        attempt_id: attempt.attempt_id.to_string(),
        status: status_label(attempt.state),
        tx_signature: attempt.tx_signature,
    })
}
