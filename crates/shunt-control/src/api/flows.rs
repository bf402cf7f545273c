//! Admission and completion endpoints.
//!
//! POST /controller/video/flowtable — admit a video flow
//! POST /controller/other/flowtable — admit a best-effort flow
//! POST /controller/other/complete  — mark a best-effort flow finished
//! GET  /controller/other/flowtable — dump the active-flow registry

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use shunt_core::TrafficClass;

use crate::api::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/video/flowtable", post(admit_video))
        .route("/other/flowtable", post(admit_other).get(list_flows))
        .route("/other/complete", post(complete))
}

#[derive(Debug, Deserialize)]
pub struct FlowRequest {
    pub src_host: String,
    pub dst_host: String,
}

/// Admission failures are reported as `200` with `"result": "fail"`, not an
/// error status; callers only look at the result field.
#[derive(Debug, Serialize)]
pub struct FlowResponse {
    pub result: &'static str,
}

impl FlowResponse {
    fn success() -> Json<Self> {
        Json(Self { result: "success" })
    }

    fn fail() -> Json<Self> {
        Json(Self { result: "fail" })
    }
}

/// A missing field or invalid JSON is a 400, so decoding is done by hand
/// instead of through the `Json` extractor.
fn parse(body: &Bytes) -> Result<FlowRequest, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(e.to_string()))
}

async fn admit_video(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<FlowResponse>, ApiError> {
    admit(state, parse(&body)?, TrafficClass::Video).await
}

async fn admit_other(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<FlowResponse>, ApiError> {
    admit(state, parse(&body)?, TrafficClass::Other).await
}

async fn admit(
    state: AppState,
    req: FlowRequest,
    class: TrafficClass,
) -> Result<Json<FlowResponse>, ApiError> {
    let mut controller = state.controller().await;
    match controller.admit(&req.src_host, &req.dst_host, class) {
        Ok(_) => Ok(FlowResponse::success()),
        Err(error) => {
            tracing::warn!(
                src = %req.src_host,
                dst = %req.dst_host,
                ?class,
                %error,
                "admission failed"
            );
            Ok(FlowResponse::fail())
        }
    }
}

/// Completion is idempotent: removing a flow that is not registered is
/// reported as success.
async fn complete(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<FlowResponse>, ApiError> {
    let req = parse(&body)?;
    let mut controller = state.controller().await;
    if let Err(error) = controller.complete(&req.src_host, &req.dst_host) {
        tracing::debug!(%error, "completion for unregistered flow");
    }
    Ok(FlowResponse::success())
}

#[derive(Debug, Serialize)]
pub struct ActiveFlow {
    pub path: Vec<String>,
    pub rate_mbps: f64,
}

async fn list_flows(State(state): State<AppState>) -> Json<BTreeMap<String, ActiveFlow>> {
    let controller = state.controller().await;
    let topo = controller.topology();
    let flows = controller
        .registry()
        .iter()
        .map(|(&(src, dst), record)| {
            let key = format!("{}{}", topo.node(src).name, topo.node(dst).name);
            let path = record
                .path
                .iter()
                .map(|&id| topo.node(id).name.clone())
                .collect();
            (
                key,
                ActiveFlow {
                    path,
                    rate_mbps: record.rate_mbps,
                },
            )
        })
        .collect();
    Json(flows)
}
