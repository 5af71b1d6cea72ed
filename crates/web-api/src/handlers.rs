use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use perp_bot_core::{EngineError, TradeKind, TradeRecord};
use serde::Serialize;

#[derive(Serialize)]
pub struct TradeResponse {
    pub message: String,
    pub trade: TradeRecord,
    pub reconciled: bool,
}

#[derive(Serialize)]
pub struct WalletResponse {
    pub address: String,
}

#[derive(Serialize)]
pub struct TradeListResponse {
    pub trades: Vec<TradeRecord>,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

type ErrorResponse = (StatusCode, Json<ErrorBody>);

/// Maps each engine error kind to a distinct status code; the settled
/// transaction hash rides along when the on-chain effect already happened.
fn error_response(err: &EngineError) -> ErrorResponse {
    let status = match err {
        EngineError::UserNotRegistered { .. } | EngineError::PositionNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        EngineError::ExecutionInProgress { .. } => StatusCode::CONFLICT,
        EngineError::SubmissionRejected(_)
        | EngineError::TransactionFailed { .. }
        | EngineError::ReconciliationMismatch { .. } => StatusCode::BAD_GATEWAY,
        EngineError::FinalityTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        EngineError::Storage(_)
        | EngineError::StorageAfterSettlement { .. }
        | EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            error: err.user_message(),
            kind: err.kind(),
            tx_hash: err.settled_tx_hash().map(str::to_string),
        }),
    )
}

fn user_id_from_headers(headers: &HeaderMap) -> Result<String, ErrorResponse> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "x-user-id header required".to_string(),
                kind: "missing_user_id",
                tx_hash: None,
            }),
        ))
}

async fn execute_trade(
    state: AppState,
    headers: HeaderMap,
    kind: TradeKind,
) -> Result<Json<TradeResponse>, ErrorResponse> {
    let user_id = user_id_from_headers(&headers)?;

    let outcome = state
        .executor
        .execute(&user_id, kind)
        .await
        .map_err(|err| error_response(&err))?;

    if let Some(notifier) = state.notifier {
        let record = outcome.record.clone();
        let reconciled = outcome.reconciled;
        tokio::spawn(async move {
            notifier.notify_trade(&user_id, &record, reconciled).await;
        });
    }

    let message = if outcome.reconciled {
        format!("Trade {} executed successfully.", outcome.record.kind)
    } else {
        format!(
            "Trade {} settled but position state did not match; verify on the explorer.",
            outcome.record.kind
        )
    };

    Ok(Json(TradeResponse {
        message,
        trade: outcome.record,
        reconciled: outcome.reconciled,
    }))
}

/// Opens the configured position for the user in the `x-user-id` header.
///
/// # Errors
/// Returns the engine error mapped per kind: 404 unregistered, 409 in
/// progress, 502 rejected/reverted, 504 ambiguous, 500 storage.
pub async fn open_position(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TradeResponse>, ErrorResponse> {
    execute_trade(state, headers, TradeKind::Open).await
}

/// Closes the user's open position.
///
/// # Errors
/// As `open_position`, plus 404 when no position is open.
pub async fn close_position(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TradeResponse>, ErrorResponse> {
    execute_trade(state, headers, TradeKind::Close).await
}

/// Returns the custodial address for a registered user.
///
/// # Errors
/// Returns 404 if the user has no wallet.
pub async fn get_wallet(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<WalletResponse>, ErrorResponse> {
    let address = state
        .executor
        .wallet_address(&user_id)
        .await
        .map_err(|err| error_response(&err))?
        .ok_or_else(|| {
            error_response(&EngineError::UserNotRegistered {
                user_id: user_id.clone(),
            })
        })?;

    Ok(Json(WalletResponse { address }))
}

/// Lists all recorded trades in insertion order.
///
/// # Errors
/// Returns 500 if the ledger cannot be read.
pub async fn list_trades(
    State(state): State<AppState>,
) -> Result<Json<TradeListResponse>, ErrorResponse> {
    let trades = state
        .executor
        .trades()
        .await
        .map_err(|err| error_response(&err))?;
    Ok(Json(TradeListResponse { trades }))
}

pub async fn health() -> &'static str {
    "ok"
}
