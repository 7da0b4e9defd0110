use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use dashmap::DashMap;
use oracle_types::{keccak256, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContainerRequest {
    pub agent_id: u64,
    pub image_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContainerResponse {
    pub handle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub result: Vec<u8>,
    pub receipt: oracle_types::Hash256,
    pub cost: U256,
    pub success: bool,
}

struct ContainerRecord {
    agent_id: u64,
    image_uri: String,
}

/// All state the simulated host needs: the set of "loaded" containers
/// (keyed by handle) plus a dedupe index so repeated `start_container`
/// calls for the same `(agent_id, image_uri)` are idempotent (spec.md
/// §4.7 "idempotent: returns an existing handle if the image is already
/// local").
pub struct HostSimState {
    containers: DashMap<String, ContainerRecord>,
    by_image: DashMap<(u64, String), String>,
    next_handle: AtomicU64,
    /// Maximum concurrently loaded containers, mirroring §5's Host API
    /// resource policy. `start_container` refuses once this is hit.
    max_containers: usize,
}

impl HostSimState {
    pub fn new(max_containers: usize) -> Arc<Self> {
        Arc::new(HostSimState {
            containers: DashMap::new(),
            by_image: DashMap::new(),
            next_handle: AtomicU64::new(0),
            max_containers,
        })
    }
}

async fn create_container(
    State(state): State<Arc<HostSimState>>,
    Json(req): Json<CreateContainerRequest>,
) -> Result<Json<CreateContainerResponse>, StatusCode> {
    let key = (req.agent_id, req.image_uri.clone());
    if let Some(existing) = state.by_image.get(&key) {
        debug!(agent_id = req.agent_id, handle = %*existing, "container already local");
        return Ok(Json(CreateContainerResponse { handle: existing.clone() }));
    }
    if state.containers.len() >= state.max_containers {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    let id = state.next_handle.fetch_add(1, Ordering::Relaxed);
    let handle = format!("h{id}");
    state.containers.insert(
        handle.clone(),
        ContainerRecord { agent_id: req.agent_id, image_uri: req.image_uri.clone() },
    );
    state.by_image.insert(key, handle.clone());
    info!(agent_id = req.agent_id, %handle, image = %req.image_uri, "container started");
    Ok(Json(CreateContainerResponse { handle }))
}

async fn invoke_container(
    State(state): State<Arc<HostSimState>>,
    Path(handle): Path<String>,
    body: axum::body::Bytes,
) -> Result<Json<InvokeResponse>, StatusCode> {
    let record = state.containers.get(&handle).ok_or(StatusCode::NOT_FOUND)?;

    // Deterministic stand-in for actually running the agent: the result is
    // the payload's digest, the cost is proportional to payload size, and
    // the receipt content-addresses `(agent_id, payload)`.
    let result = keccak256(&body).0.to_vec();
    let mut manifest = record.agent_id.to_be_bytes().to_vec();
    manifest.extend_from_slice(&body);
    let receipt = keccak256(&manifest);
    let cost = U256::from(body.len() as u64 + 1);

    Ok(Json(InvokeResponse { result, receipt, cost, success: true }))
}

async fn stop_container(
    State(state): State<Arc<HostSimState>>,
    Path(handle): Path<String>,
) -> StatusCode {
    if let Some((_, record)) = state.containers.remove(&handle) {
        state.by_image.remove(&(record.agent_id, record.image_uri));
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub fn router(state: Arc<HostSimState>) -> Router {
    Router::new()
        .route("/containers", post(create_container))
        .route("/containers/:handle/invoke", post(invoke_container))
        .route("/containers/:handle", delete(stop_container))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        router(HostSimState::new(8))
    }

    #[tokio::test]
    async fn start_container_is_idempotent_by_image() {
        let app = app();
        let req = |body: &str| {
            Request::builder()
                .method("POST")
                .uri("/containers")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        };
        let body = r#"{"agent_id":1,"image_uri":"oci://agent:latest"}"#;
        let r1 = app.clone().oneshot(req(body)).await.unwrap();
        assert_eq!(r1.status(), StatusCode::OK);
        let bytes1 = axum::body::to_bytes(r1.into_body(), usize::MAX).await.unwrap();
        let h1: CreateContainerResponse = serde_json::from_slice(&bytes1).unwrap();

        let r2 = app.clone().oneshot(req(body)).await.unwrap();
        let bytes2 = axum::body::to_bytes(r2.into_body(), usize::MAX).await.unwrap();
        let h2: CreateContainerResponse = serde_json::from_slice(&bytes2).unwrap();
        assert_eq!(h1.handle, h2.handle);
    }

    #[tokio::test]
    async fn invoke_unknown_handle_is_not_found() {
        let app = app();
        let req = Request::builder()
            .method("POST")
            .uri("/containers/bogus/invoke")
            .body(Body::from(vec![1, 2, 3]))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
