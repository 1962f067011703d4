//! Shared handler state.

use std::sync::Arc;

use recolor_cleanup::CleanupMonitor;
use recolor_pipeline::ColorizePipeline;
use recolor_telemetry::Metrics;

pub(crate) struct ApiState {
    pub(crate) pipeline: Arc<ColorizePipeline>,
    pub(crate) telemetry: Metrics,
    pub(crate) cleanup: Option<CleanupMonitor>,
}

impl ApiState {
    pub(crate) const fn new(
        pipeline: Arc<ColorizePipeline>,
        telemetry: Metrics,
        cleanup: Option<CleanupMonitor>,
    ) -> Self {
        Self {
            pipeline,
            telemetry,
            cleanup,
        }
    }
}
