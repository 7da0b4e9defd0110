use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use oracle_runner::{ChainClient, QuorumRequest, QuorumResponse, QuorumState};
use oracle_types::Address;
use tracing::warn;

use crate::chain_client::HttpChainClient;

/// Serves this validator's own `/quorum` endpoint so peers can ask
/// whether it intends to run a given request (spec.md §4.6, §9).
pub struct QuorumServerState {
    pub quorum: Arc<QuorumState>,
    pub chain: Arc<HttpChainClient>,
    pub self_addr: Address,
}

async fn answer_quorum(
    State(state): State<Arc<QuorumServerState>>,
    Json(req): Json<QuorumRequest>,
) -> Json<QuorumResponse> {
    let is_member = match state.chain.get_subcommittee(req.request_id).await {
        Ok(members) => members.contains(&state.self_addr),
        Err(err) => {
            warn!(request_id = %req.request_id, %err, "quorum probe: subcommittee lookup failed");
            false
        }
    };
    Json(state.quorum.answer(req.request_id, is_member))
}

pub fn router(state: Arc<QuorumServerState>) -> Router {
    Router::new().route("/quorum", post(answer_quorum)).with_state(state)
}
