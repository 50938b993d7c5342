use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use peerpay_core::TransferError;
use peerpay_infra::LedgerStoreError;

pub fn transfer_error_to_response(err: TransferError) -> axum::response::Response {
    let status = match &err {
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        TransferError::CommunicationFailure(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, err.code(), err.to_string())
}

pub fn store_error_to_response(err: LedgerStoreError) -> axum::response::Response {
    tracing::error!(error = %err, "ledger read failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
