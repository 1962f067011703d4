//! Process and request context for spans.
//!
//! # Design
//! - A leaked `service` span carries the run mode and build SHA for the process lifetime.
//! - `x-request-id` is generated at the edge and copied back onto responses.
//! - The active request id is held in task-local storage so jobs started by a request
//!   can tag their own spans with it.

use std::future::Future;
use std::sync::Arc;

use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the service-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the service-level span, tagged with `mode` and the build SHA.
    #[must_use]
    pub fn new(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "service",
            mode = %mode,
            build_sha = %build_sha()
        )));
        Self {
            _guard: span.enter(),
        }
    }
}

/// Layer generating an `x-request-id` header when the client did not send one.
#[must_use]
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer copying the request's `x-request-id` onto the response.
#[must_use]
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

tokio::task_local! {
    static REQUEST_ID: Arc<str>;
}

/// Run `fut` with `request_id` available through [`current_request_id`].
pub async fn with_request_context<Fut, T>(request_id: impl Into<String>, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    REQUEST_ID.scope(Arc::from(request_id.into()), fut).await
}

/// Request id of the enclosing [`with_request_context`] scope, if any.
#[must_use]
pub fn current_request_id() -> Option<String> {
    REQUEST_ID
        .try_with(|id| id.as_ref().to_string())
        .ok()
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_context_guard_can_be_entered_and_dropped() {
        let guard = GlobalContextGuard::new("test");
        drop(guard);
    }

    #[test]
    fn request_id_layers_can_be_constructed() {
        let _set_layer = set_request_id_layer();
        let _prop_layer = propagate_request_id_layer();
    }

    #[tokio::test]
    async fn request_id_is_scoped_to_the_future() {
        let seen = with_request_context("req-7", async { current_request_id() }).await;
        assert_eq!(seen.as_deref(), Some("req-7"));
        assert!(current_request_id().is_none());

        let blank = with_request_context("", async { current_request_id() }).await;
        assert!(blank.is_none());
    }
}
