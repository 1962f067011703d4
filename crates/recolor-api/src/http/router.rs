//! Router construction and server host for the API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    http::{Method, Request, header::CONTENT_TYPE},
    routing::{get, post},
};
use recolor_cleanup::CleanupMonitor;
use recolor_pipeline::ColorizePipeline;
use recolor_telemetry::{Metrics, build_sha};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::colorize::colorize;
use crate::http::constants::{HEADER_REQUEST_ID, MULTIPART_OVERHEAD_BYTES};
use crate::http::health::{health, metrics};
use crate::http::requests::track_request;
use crate::state::ApiState;

/// Axum router wrapper that hosts the colorization API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Build the router around a pipeline.
    ///
    /// `max_upload_bytes` bounds the request body (plus multipart framing); the pipeline
    /// enforces the exact file limit. `cleanup` feeds the health report when present.
    #[must_use]
    pub fn new(
        pipeline: Arc<ColorizePipeline>,
        telemetry: Metrics,
        cleanup: Option<CleanupMonitor>,
        max_upload_bytes: u64,
    ) -> Self {
        let state = Arc::new(ApiState::new(pipeline, telemetry.clone(), cleanup));
        let body_limit = usize::try_from(max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES))
            .unwrap_or(usize::MAX);

        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();

                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(recolor_telemetry::propagate_request_id_layer())
            .layer(recolor_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(middleware::from_fn_with_state(telemetry, track_request));

        let router = Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route(
                "/api/colorize",
                post(colorize).layer(DefaultBodyLimit::max(body_limit)),
            )
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    /// Serve the API on the supplied address until the server fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        self.serve_with_shutdown(addr, std::future::pending()).await
    }

    /// Serve the API until `shutdown` resolves, then drain in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve_with_shutdown<F>(self, addr: SocketAddr, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        tracing::info!(%addr, "starting api");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }

    #[cfg(test)]
    pub(crate) fn router(&self) -> Router {
        self.router.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::path::Path;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{StatusCode, header};
    use base64::{Engine as _, engine::general_purpose};
    use recolor_pipeline::PipelineLimits;
    use recolor_storage::{SystemClock, TempStorage};
    use recolor_test_support::fixtures::{Part, SAMPLE_IMAGE, multipart_body, multipart_content_type};
    use recolor_worker::{Invocation, Worker, WorkerError, WorkerResult};
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    use crate::models::{ColorizeResponse, ProblemDetails};

    type TestResult = Result<(), Box<dyn Error>>;

    /// Copies the input into the output directory without spawning anything.
    struct EchoWorker;

    #[async_trait]
    impl Worker for EchoWorker {
        async fn invoke(&self, input: &Path, output_dir: &Path) -> WorkerResult<Invocation> {
            let wait = |source| WorkerError::Wait { source };
            tokio::fs::create_dir_all(output_dir).await.map_err(wait)?;
            let name = input.file_name().map(ToOwned::to_owned).unwrap_or_default();
            tokio::fs::copy(input, output_dir.join(name))
                .await
                .map_err(wait)?;
            Ok(Invocation {
                input_path: input.to_path_buf(),
                output_dir: output_dir.to_path_buf(),
                exit_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
                elapsed: Duration::from_millis(1),
            })
        }
    }

    fn server(temp: &TempDir, worker: Arc<dyn Worker>) -> Result<(ApiServer, Metrics), Box<dyn Error>> {
        let metrics = Metrics::new()?;
        let limits = PipelineLimits {
            max_upload_bytes: 1024,
            max_result_bytes: 1024,
        };
        let pipeline = ColorizePipeline::new(
            TempStorage::new(temp.path())?,
            worker,
            limits,
            Arc::new(SystemClock),
            metrics.clone(),
        );
        let server = ApiServer::new(Arc::new(pipeline), metrics.clone(), None, limits.max_upload_bytes);
        Ok((server, metrics))
    }

    fn upload_request(parts: &[Part<'_>]) -> Result<Request<Body>, Box<dyn Error>> {
        Ok(Request::builder()
            .method(Method::POST)
            .uri("/api/colorize")
            .header(header::CONTENT_TYPE, multipart_content_type())
            .body(Body::from(multipart_body(parts)))?)
    }

    async fn problem(response: axum::response::Response) -> Result<ProblemDetails, Box<dyn Error>> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn colorize_returns_base64_result() -> TestResult {
        let temp = TempDir::new()?;
        let (server, metrics) = server(&temp, Arc::new(EchoWorker))?;

        let response = server
            .router()
            .oneshot(upload_request(&[
                Part {
                    name: "note",
                    filename: None,
                    data: b"ignored",
                },
                Part {
                    name: "image",
                    filename: Some("photo.png"),
                    data: SAMPLE_IMAGE,
                },
            ])?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(HEADER_REQUEST_ID));

        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body: ColorizeResponse = serde_json::from_slice(&bytes)?;
        assert_eq!(body.content_type, "image/png");
        assert_eq!(general_purpose::STANDARD.decode(body.result)?, SAMPLE_IMAGE);
        assert_eq!(metrics.snapshot().jobs_succeeded_total, 1);
        Ok(())
    }

    #[tokio::test]
    async fn missing_image_field_is_an_upload_error() -> TestResult {
        let temp = TempDir::new()?;
        let (server, _metrics) = server(&temp, Arc::new(EchoWorker))?;

        let response = server
            .router()
            .oneshot(upload_request(&[Part {
                name: "picture",
                filename: Some("photo.png"),
                data: SAMPLE_IMAGE,
            }])?)
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = problem(response).await?;
        assert_eq!(body.error_kind.as_deref(), Some("upload_error"));
        assert_eq!(body.status, 400);
        assert_eq!(std::fs::read_dir(temp.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn non_multipart_requests_are_rejected() -> TestResult {
        let temp = TempDir::new()?;
        let (server, _metrics) = server(&temp, Arc::new(EchoWorker))?;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/colorize")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))?;
        let response = server.router().oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(problem(response).await?.error_kind.as_deref(), Some("upload_error"));
        Ok(())
    }

    #[tokio::test]
    async fn oversized_upload_is_payload_too_large() -> TestResult {
        let temp = TempDir::new()?;
        let (server, _metrics) = server(&temp, Arc::new(EchoWorker))?;
        let payload = vec![1_u8; 4096];

        let response = server
            .router()
            .oneshot(upload_request(&[Part {
                name: "image",
                filename: Some("big.jpg"),
                data: &payload,
            }])?)
            .await?;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn worker_failure_is_bad_gateway() -> TestResult {
        use recolor_test_support::scripts::FakeWorker;
        use recolor_worker::{ProcessWorker, WorkerCommand};

        let script = FakeWorker::exit_with(1)?;
        let temp = TempDir::new()?;
        let worker = ProcessWorker::new(WorkerCommand::new("sh").with_args([script.path_str()]));
        let (server, _metrics) = server(&temp, Arc::new(worker))?;

        let response = server
            .router()
            .oneshot(upload_request(&[Part {
                name: "image",
                filename: Some("photo.jpg"),
                data: SAMPLE_IMAGE,
            }])?)
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = problem(response).await?;
        assert_eq!(body.error_kind.as_deref(), Some("worker_error"));
        assert_eq!(
            body.detail.as_deref(),
            Some("image colorization failed with code: 1")
        );
        Ok(())
    }

    #[tokio::test]
    async fn health_and_metrics_are_served() -> TestResult {
        let temp = TempDir::new()?;
        let (server, _metrics) = server(&temp, Arc::new(EchoWorker))?;
        let router = server.router();

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let health: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["layout"], "per_job");
        assert!(health["cleanup"]["state"].is_null());

        let response = router
            .oneshot(Request::builder().uri("/metrics").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).map(|value| value.as_bytes()),
            Some(&b"text/plain; version=0.0.4"[..])
        );
        let text = String::from_utf8(to_bytes(response.into_body(), usize::MAX).await?.to_vec())?;
        assert!(text.contains("http_requests_total{code=\"200\",route=\"/health\"} 1"));
        Ok(())
    }
}
