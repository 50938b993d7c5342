//! Live ledger stream over Server-Sent Events.
//!
//! Each connection receives, in order:
//! - `client_id`: an id for this connection
//! - `accounts`: the current account set
//! - `accounts` / `transfers`: full replacements after every commit
//!
//! Event data is always `{"type": <event name>, "data": ...}`.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use axum::{
    extract::Extension,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use serde_json::json;
use tokio::sync::mpsc::unbounded_channel;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::app::{errors, services::AppServices};

/// GET /stream
///
/// Each open stream occupies one thread of tokio's blocking pool (512 by
/// default) until the client disconnects. Past that limit new connections
/// still get their `client_id` but no ledger events until a slot frees up.
pub async fn stream(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let subscription = match services.engine.on_connect().await {
        Ok(subscription) => subscription,
        Err(e) => return errors::store_error_to_response(e),
    };

    let client_id = Uuid::now_v7();
    tracing::info!(
        %client_id,
        observers = services.engine.publisher().observer_count(),
        "stream client connected"
    );

    let (tx, rx) = unbounded_channel::<Result<SseEvent, Infallible>>();

    let greeting = json!({ "type": "client_id", "data": client_id });
    // Receiver is alive: it is returned below.
    let _ = tx.send(Ok(SseEvent::default().event("client_id").data(greeting.to_string())));

    // The bus hands out std receivers; forward them from a blocking task.
    tokio::task::spawn_blocking(move || {
        loop {
            match subscription.recv_timeout(Duration::from_millis(1000)) {
                Ok(update) => {
                    let topic = update.topic();
                    let data = match serde_json::to_string(&update) {
                        Ok(s) => s,
                        Err(e) => {
                            tracing::warn!(
                                %client_id,
                                topic,
                                error = %e,
                                "failed to encode ledger update"
                            );
                            continue;
                        }
                    };

                    if tx.send(Ok(SseEvent::default().event(topic).data(data))).is_err() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if tx.is_closed() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::info!(%client_id, "stream client disconnected");
    });

    Sse::new(UnboundedReceiverStream::new(rx))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response()
}
