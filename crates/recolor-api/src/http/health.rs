//! Health and diagnostics endpoints.

use std::sync::Arc;

use axum::{Json, body::Body, extract::State, http::StatusCode, response::Response};
use recolor_cleanup::{SchedulerState, SweepSummary};
use recolor_storage::StagingLayout;
use recolor_telemetry::{MetricsSnapshot, build_sha};
use serde::Serialize;
use tracing::error;

use crate::http::errors::ApiError;
use crate::state::ApiState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) build: String,
    pub(crate) storage_root: String,
    pub(crate) layout: StagingLayout,
    pub(crate) cleanup: CleanupHealth,
    pub(crate) metrics: MetricsSnapshot,
}

#[derive(Serialize)]
pub(crate) struct CleanupHealth {
    pub(crate) state: Option<SchedulerState>,
    pub(crate) last_run: Option<SweepSummary>,
}

pub(crate) async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let storage = state.pipeline.storage();
    let last_run = state.cleanup.as_ref().and_then(|monitor| monitor.last_run());
    let scheduler_state = state.cleanup.as_ref().map(|monitor| monitor.state());

    let degraded = matches!(scheduler_state, Some(SchedulerState::Stopped))
        || last_run.as_ref().is_some_and(|run| !run.succeeded());

    Json(HealthResponse {
        status: if degraded { "degraded" } else { "ok" },
        build: build_sha().to_string(),
        storage_root: storage.root().display().to_string(),
        layout: storage.layout(),
        cleanup: CleanupHealth {
            state: scheduler_state,
            last_run,
        },
        metrics: state.telemetry.snapshot(),
    })
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.telemetry.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}
