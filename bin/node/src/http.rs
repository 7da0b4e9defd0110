use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use oracle_agent_registry::InMemoryAgentRegistry;
use oracle_committee::UpkeepOutcome;
use oracle_consensus::{ConsensusError, SubmitOutcome};
use oracle_engine::{CreateRequestParams, Engine, EngineError};
use oracle_ledger::{CallbackTarget, InMemoryStore, Request, Response as LedgerResponse};
use oracle_types::{Address, ConsensusType, Hash256, Status, U256};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::events_log::EventFeed;

pub type NodeEngine = Engine<InMemoryStore, InMemoryAgentRegistry>;

pub struct AppState {
    pub engine: Arc<NodeEngine>,
    pub feed: Arc<EventFeed>,
}

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs()
}

/// Maps the `EngineError` taxonomy of spec.md §7 onto HTTP status codes.
/// Validation/threshold/deposit errors are client mistakes (400);
/// not-found is 404; authorization/state conflicts are 409/403.
impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::InvalidThreshold { .. } | EngineError::IncorrectDeposit { .. } => {
                StatusCode::BAD_REQUEST
            }
            EngineError::Committee(oracle_committee::CommitteeError::InsufficientMembers {
                ..
            }) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Committee(oracle_committee::CommitteeError::NoBalance) => {
                StatusCode::NOT_FOUND
            }
            EngineError::Committee(_) => StatusCode::BAD_REQUEST,
            EngineError::AgentRegistry(_) => StatusCode::NOT_FOUND,
            EngineError::Consensus(ConsensusError::RequestNotFound(_)) => StatusCode::NOT_FOUND,
            EngineError::Consensus(ConsensusError::NotSubcommitteeMember) => {
                StatusCode::FORBIDDEN
            }
            EngineError::Consensus(_) => StatusCode::CONFLICT,
        };
        error!(error = %self, "request failed");
        (status, self.to_string()).into_response()
    }
}

/// Wraps `EngineError` so handlers that parse a path segment before
/// touching the engine can surface a 400 instead of forcing a malformed
/// id through `EngineError`'s not-found/conflict taxonomy.
pub enum ApiError {
    Engine(EngineError),
    BadRequest(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Engine(err) => err.into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub validator: Address,
}

#[derive(Debug, Serialize)]
pub struct UpkeepResponse {
    pub epoch: u64,
    pub members: Vec<Address>,
    pub changed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub who: Address,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRequestBody {
    pub agent_id: u64,
    pub requester: Address,
    pub callback_address: Option<Address>,
    #[serde(default)]
    pub callback_selector: [u8; 4],
    #[serde(default)]
    pub payload: Vec<u8>,
    pub deposit_value: U256,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAdvancedRequestBody {
    #[serde(flatten)]
    pub base: CreateRequestBody,
    pub subcommittee_size: usize,
    pub threshold: usize,
    pub consensus_type: ConsensusType,
}

#[derive(Debug, Serialize)]
pub struct RequestIdResponse {
    pub request_id: U256,
}

#[derive(Debug, Serialize)]
pub struct RequestView {
    pub id: U256,
    pub requester: Address,
    pub callback_address: Option<Address>,
    pub subcommittee: Vec<Address>,
    pub response_count: usize,
    pub failure_count: usize,
    pub threshold: usize,
    pub created_at: u64,
    pub status: Status,
    pub consensus_type: ConsensusType,
    pub agent_creator: Option<Address>,
    pub max_cost: U256,
    pub final_cost: U256,
}

impl From<Request> for RequestView {
    fn from(r: Request) -> Self {
        RequestView {
            id: r.id,
            requester: r.requester,
            callback_address: r.callback.address,
            subcommittee: r.subcommittee,
            response_count: r.response_count,
            failure_count: r.failure_count,
            threshold: r.threshold,
            created_at: r.created_at,
            status: r.status,
            consensus_type: r.consensus_type,
            agent_creator: r.agent_creator,
            max_cost: r.max_cost,
            final_cost: r.final_cost,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResponseView {
    pub validator: Address,
    pub result: Vec<u8>,
    pub success: bool,
    pub receipt: Hash256,
    pub cost: U256,
    pub timestamp: u64,
}

impl From<LedgerResponse> for ResponseView {
    fn from(r: LedgerResponse) -> Self {
        ResponseView {
            validator: r.validator,
            result: r.result,
            success: r.success,
            receipt: r.receipt,
            cost: r.cost,
            timestamp: r.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponseBody {
    pub validator: Address,
    pub result: Vec<u8>,
    pub receipt: Hash256,
    pub cost: U256,
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome")]
pub enum SubmitOutcomeView {
    Recorded { finalized: Option<Status> },
    Ignored,
}

impl From<SubmitOutcome> for SubmitOutcomeView {
    fn from(o: SubmitOutcome) -> Self {
        match o {
            SubmitOutcome::Recorded { finalized } => SubmitOutcomeView::Recorded { finalized },
            SubmitOutcome::Ignored => SubmitOutcomeView::Ignored,
        }
    }
}

async fn heartbeat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<HeartbeatRequest>,
) -> StatusCode {
    state.engine.heartbeat(body.validator, now());
    StatusCode::OK
}

async fn upkeep(State(state): State<Arc<AppState>>) -> Json<UpkeepResponse> {
    match state.engine.committee_upkeep(now()) {
        UpkeepOutcome::NewEpoch { epoch, members } => {
            Json(UpkeepResponse { epoch, members, changed: true })
        }
        UpkeepOutcome::NoChange => {
            Json(UpkeepResponse { epoch: state.engine.current_epoch(), members: vec![], changed: false })
        }
    }
}

async fn active_members(State(state): State<Arc<AppState>>) -> Json<Vec<Address>> {
    Json(state.engine.get_active_members(now()))
}

async fn epoch(State(state): State<Arc<AppState>>) -> Json<u64> {
    Json(state.engine.current_epoch())
}

async fn pending_balance(
    State(state): State<Arc<AppState>>,
    Path(addr): Path<String>,
) -> Result<Json<U256>, (StatusCode, String)> {
    let addr = crate::config::parse_address(&addr)
        .map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))?;
    Ok(Json(state.engine.pending_balance(addr)))
}

async fn claim(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ClaimRequest>,
) -> Result<Json<U256>, EngineError> {
    Ok(Json(state.engine.claim(body.who)?))
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRequestBody>,
) -> Result<Json<RequestIdResponse>, EngineError> {
    let callback = CallbackTarget { address: body.callback_address, selector: body.callback_selector };
    let id = state.engine.create_request(
        body.agent_id,
        body.requester,
        callback,
        body.payload,
        body.deposit_value,
        now(),
    )?;
    Ok(Json(RequestIdResponse { request_id: id }))
}

async fn create_advanced_request(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAdvancedRequestBody>,
) -> Result<Json<RequestIdResponse>, EngineError> {
    let callback =
        CallbackTarget { address: body.base.callback_address, selector: body.base.callback_selector };
    let id = state.engine.create_advanced_request(CreateRequestParams {
        agent_id: body.base.agent_id,
        requester: body.base.requester,
        callback,
        payload: body.base.payload,
        deposit_value: body.base.deposit_value,
        subcommittee_size: body.subcommittee_size,
        threshold: body.threshold,
        consensus_type: body.consensus_type,
        now: now(),
    })?;
    Ok(Json(RequestIdResponse { request_id: id }))
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RequestView>, ApiError> {
    let id = parse_u256(&id)?;
    Ok(Json(state.engine.get_request(id)?.into()))
}

async fn get_responses(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ResponseView>>, ApiError> {
    let id = parse_u256(&id)?;
    Ok(Json(state.engine.get_responses(id)?.into_iter().map(ResponseView::from).collect()))
}

async fn get_deposit(State(state): State<Arc<AppState>>) -> Json<U256> {
    Json(state.engine.get_request_deposit())
}

#[derive(Debug, Serialize)]
pub struct AgentView {
    pub metadata_uri: String,
    pub container_image_uri: String,
    pub owner: Address,
}

async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<AgentView>, EngineError> {
    let meta = state.engine.get_agent(id)?;
    Ok(Json(AgentView {
        metadata_uri: meta.metadata_uri,
        container_image_uri: meta.container_image_uri,
        owner: meta.owner,
    }))
}

async fn submit_response(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SubmitResponseBody>,
) -> Result<Json<SubmitOutcomeView>, ApiError> {
    let id = parse_u256(&id)?;
    let outcome = state.engine.submit_response(
        id,
        body.validator,
        body.result,
        body.receipt,
        body.cost,
        body.success,
        now(),
    )?;
    Ok(Json(outcome.into()))
}

async fn timeout_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_u256(&id)?;
    state.engine.timeout_request(id, now())?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub since: String,
    #[serde(default = "default_feed_limit")]
    pub limit: usize,
}

fn default_feed_limit() -> usize {
    100
}

async fn feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<crate::events_log::RequestCreatedRecord>>, ApiError> {
    let since = if query.since.is_empty() { U256::ZERO } else { parse_u256(&query.since)? };
    Ok(Json(state.feed.since(since, query.limit)))
}

/// Ids round-trip through the API as decimal strings so the 256-bit
/// width survives JSON (which has no native 256-bit integer).
fn parse_u256(s: &str) -> Result<U256, ApiError> {
    s.parse::<U256>().map_err(|_| ApiError::BadRequest(format!("invalid request id: {s}")))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/committee/heartbeat", post(heartbeat))
        .route("/committee/upkeep", post(upkeep))
        .route("/committee/active", get(active_members))
        .route("/committee/epoch", get(epoch))
        .route("/committee/balance/:addr", get(pending_balance))
        .route("/committee/claim", post(claim))
        .route("/requests", post(create_request))
        .route("/requests/advanced", post(create_advanced_request))
        .route("/requests/deposit", get(get_deposit))
        .route("/agents/:id", get(get_agent))
        .route("/requests/feed", get(feed))
        .route("/requests/:id", get(get_request))
        .route("/requests/:id/responses", get(get_responses).post(submit_response))
        .route("/requests/:id/timeout", post(timeout_request))
        .with_state(state)
}
