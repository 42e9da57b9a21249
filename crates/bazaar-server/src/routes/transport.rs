//! Relay delivery webhook.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST   | `/v1/transport/deliver` | Hand one transport item to the inbound processor |
//!
//! The relay only learns whether the item was accepted. Rejections are the
//! node's business; an item that failed on a retryable error stays in the
//! ledger as `WAITING` for the retry scheduler.

use axum::{extract::State, routing::post, Json, Router};
use bazaar_common::{models::TransportItem, BazaarResult};
use serde::Serialize;
use std::sync::Arc;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct DeliverResponse {
    pub accepted: bool,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/v1/transport/deliver", post(deliver))
}

async fn deliver(
    State(state): State<Arc<AppState>>,
    Json(item): Json<TransportItem>,
) -> BazaarResult<Json<DeliverResponse>> {
    let outcome = state.processor.process(&item).await?;
    tracing::debug!(
        transport_id = %item.transport_id,
        status = outcome.status.as_str(),
        "Transport item delivered"
    );
    Ok(Json(DeliverResponse { accepted: outcome.accepted }))
}
