//! Outbound send.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST   | `/v1/messages` | Sign, transmit and store one channel message |
//!
//! Errors map through [`BazaarError`](bazaar_common::BazaarError): bad fields
//! are 400, an oversized envelope 413, a signing failure 422 and a relay
//! failure 502.

use axum::{extract::State, routing::post, Json, Router};
use bazaar_common::BazaarResult;
use bazaar_delivery::SendParams;
use serde::Serialize;
use std::sync::Arc;

use super::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub transport_id: String,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/v1/messages", post(send_message))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(params): Json<SendParams>,
) -> BazaarResult<Json<SendResponse>> {
    let transport_id = state.outbound.send(params).await?;
    Ok(Json(SendResponse { transport_id }))
}
