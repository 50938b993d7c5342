use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    response::IntoResponse,
};
use serde_json::json;

use peerpay_core::TransferError;
use peerpay_infra::LedgerStore;
use peerpay_ledger::{RECENT_TRANSFER_LIMIT, TransferRequest};

use crate::app::{dto::TransferBody, errors, services::AppServices};

/// POST /transfer
///
/// Acknowledges with `{"status": "ok"}`; the new state reaches clients
/// through `/stream`.
pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<TransferBody>, JsonRejection>,
) -> axum::response::Response {
    // An unreadable body carries no usable ids, so it fails validation like
    // an empty one: `invalid_sender` first.
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "unreadable transfer body");
            TransferBody::default()
        }
    };

    let Some(sender) = body.sender() else {
        return errors::transfer_error_to_response(TransferError::InvalidSender);
    };

    let Some(receiver) = body.receiver() else {
        // The sender check still comes first.
        return match services.engine.store().get_account(sender).await {
            Ok(Some(_)) => errors::transfer_error_to_response(TransferError::InvalidReceiver),
            Ok(None) => errors::transfer_error_to_response(TransferError::InvalidSender),
            Err(e) => errors::store_error_to_response(e),
        };
    };

    match services
        .engine
        .transfer(TransferRequest::new(sender, receiver, body.amount()))
        .await
    {
        Ok(_) => Json(json!({ "status": "ok" })).into_response(),
        Err(e) => errors::transfer_error_to_response(e),
    }
}

/// GET /transfers/recent
pub async fn recent(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services
        .engine
        .store()
        .get_recent_transfers(RECENT_TRANSFER_LIMIT)
        .await
    {
        Ok(transfers) => Json(transfers).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
