//! Account handlers: balance and transaction history

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, ok};
use crate::core_types::{AccountId, TxKind};
use crate::money;
use crate::recorder::RecordFilter;
use crate::settlement::TransferError;

/// Balance response data
#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub account_id: i64,
    #[schema(example = "1000")]
    pub balance: String,
    #[schema(example = "USDC")]
    pub currency: String,
}

/// Get balance endpoint
///
/// GET /api/v1/balance
#[utoipa::path(
    get,
    path = "/api/v1/balance",
    responses(
        (status = 200, description = "Current balance", body = BalanceResponse, content_type = "application/json"),
        (status = 401, description = "Authentication failed"),
        (status = 404, description = "Account not found")
    ),
    security(("session_jwt" = [])),
    tag = "Account"
)]
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Extension(account_id): Extension<AccountId>,
) -> ApiResult<BalanceResponse> {
    let account = state
        .ledger
        .account(account_id)
        .await
        .map_err(|e| ApiError::from(TransferError::from(e)))?;

    ok(BalanceResponse {
        account_id: account.owner_id.as_i64(),
        balance: money::format_amount(account.balance, account.currency.decimals()),
        currency: account.currency.code().to_string(),
    })
}

/// Transaction history query
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransactionsQuery {
    /// SENT or RECEIVED; omitted = both
    pub kind: Option<String>,
    /// Page size, default 50
    pub limit: Option<i64>,
}

/// One history entry, direction relative to the viewing account.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionView {
    pub id: i64,
    /// SENT | RECEIVED
    #[schema(example = "SENT")]
    pub kind: String,
    /// Counterparty: platform account id or external chain address
    pub counterparty: String,
    #[schema(example = "300")]
    pub amount: String,
    #[schema(example = "USDC")]
    pub currency: String,
    #[schema(example = "COMPLETED")]
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Transaction history response data
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionsResponse {
    pub transactions: Vec<TransactionView>,
}

const MAX_PAGE_SIZE: i64 = 200;

/// List transactions endpoint
///
/// GET /api/v1/transactions
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    params(
        ("kind" = Option<String>, Query, description = "Filter: SENT or RECEIVED"),
        ("limit" = Option<i64>, Query, description = "Page size (max 200)")
    ),
    responses(
        (status = 200, description = "Transaction history, newest first", body = TransactionsResponse, content_type = "application/json"),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Authentication failed")
    ),
    security(("session_jwt" = [])),
    tag = "Account"
)]
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(account_id): Extension<AccountId>,
    Query(query): Query<TransactionsQuery>,
) -> ApiResult<TransactionsResponse> {
    let kind = match query.kind.as_deref() {
        None => None,
        Some("SENT") => Some(TxKind::Sent),
        Some("RECEIVED") => Some(TxKind::Received),
        Some(other) => {
            return ApiError::bad_request(format!("Unknown kind: {}", other)).into_err();
        }
    };

    let mut filter = RecordFilter::for_account(account_id);
    filter.limit = query.limit.unwrap_or(50).clamp(1, MAX_PAGE_SIZE);

    // The stored kind is relative to the sender; the view direction is
    // relative to the viewer. Filter on the derived direction below.
    let records = state
        .recorder
        .list(&RecordFilter {
            kind: None,
            ..filter.clone()
        })
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let transactions = records
        .into_iter()
        .map(|r| {
            let (direction, counterparty) = if r.sender == Some(account_id) {
                (TxKind::Sent, r.receiver.storage_value())
            } else {
                (
                    TxKind::Received,
                    r.sender
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "platform".to_string()),
                )
            };
            (r, direction, counterparty)
        })
        .filter(|(_, direction, _)| kind.is_none_or(|k| k == *direction))
        .map(|(r, direction, counterparty)| TransactionView {
            id: r.id,
            kind: direction.as_str().to_string(),
            counterparty,
            amount: money::format_amount(r.amount, r.currency.decimals()),
            currency: r.currency.code().to_string(),
            status: r.status.as_str().to_string(),
            timestamp: r.timestamp,
        })
        .collect();

    ok(TransactionsResponse { transactions })
}
