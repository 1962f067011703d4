//! Per-request bookkeeping shared by every route.

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use recolor_telemetry::{Metrics, with_request_context};

use crate::http::constants::HEADER_REQUEST_ID;

/// Run the handler inside the request-id scope, then count the response by route and status.
///
/// The id is read after `SetRequestId` ran, so every request has one; the pipeline picks it
/// up for its job span.
pub(crate) async fn track_request(
    State(telemetry): State<Metrics>,
    req: Request,
    next: Next,
) -> Response {
    let route = req.extensions().get::<MatchedPath>().map_or_else(
        || req.uri().path().to_string(),
        |matched| matched.as_str().to_string(),
    );
    let request_id = req
        .headers()
        .get(HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let response = with_request_context(request_id, next.run(req)).await;
    telemetry.inc_http_request(&route, response.status().as_u16());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, middleware, routing::get};
    use recolor_telemetry::current_request_id;
    use std::error::Error;
    use tower::ServiceExt;

    async fn echo_request_id() -> String {
        current_request_id().unwrap_or_default()
    }

    #[tokio::test]
    async fn handlers_see_the_request_id_and_responses_are_counted() -> Result<(), Box<dyn Error>>
    {
        let telemetry = Metrics::new()?;
        let app = Router::new()
            .route("/jobs/{id}", get(echo_request_id))
            .route_layer(middleware::from_fn_with_state(telemetry.clone(), track_request));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/jobs/7")
                    .header(HEADER_REQUEST_ID, "req-42")
                    .body(Body::empty())?,
            )
            .await?;
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(&body[..], b"req-42");

        let rendered = telemetry.render()?;
        assert!(rendered.contains("http_requests_total{code=\"200\",route=\"/jobs/{id}\"} 1"));
        Ok(())
    }
}
