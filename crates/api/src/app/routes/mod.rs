use axum::{
    Router,
    routing::{get, post},
};

pub mod accounts;
pub mod stream;
pub mod system;
pub mod transfers;

/// Router for the ledger endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/transfer", post(transfers::submit))
        .route("/transfers/recent", get(transfers::recent))
        .route("/accounts", get(accounts::list))
        .route("/stream", get(stream::stream))
}
