use std::sync::Arc;

use axum::{Json, extract::Extension, response::IntoResponse};

use peerpay_infra::LedgerStore;

use crate::app::{errors, services::AppServices};

/// GET /accounts
pub async fn list(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.engine.store().get_all_accounts().await {
        Ok(accounts) => Json(accounts).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
