//! RFC9457-style API error wrapper.

use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use recolor_pipeline::{ErrorKind, PipelineError, UploadRejection};
use recolor_worker::WorkerError;

use crate::http::constants::{
    PROBLEM_INTERNAL, PROBLEM_PAYLOAD_TOO_LARGE, PROBLEM_RESULT_MISSING, PROBLEM_TIMEOUT,
    PROBLEM_UPLOAD, PROBLEM_WORKER, UPLOAD_FIELD,
};
use crate::models::ProblemDetails;

/// Structured API error rendered as a problem document.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    title: &'static str,
    detail: Option<String>,
    error_kind: Option<ErrorKind>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
            error_kind: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    const fn with_error_kind(mut self, kind: ErrorKind) -> Self {
        self.error_kind = Some(kind);
        self
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(message)
    }

    pub(crate) fn bad_upload(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_UPLOAD, "upload rejected")
            .with_detail(detail)
            .with_error_kind(ErrorKind::Upload)
    }

    fn payload_too_large(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            PROBLEM_PAYLOAD_TOO_LARGE,
            "upload too large",
        )
        .with_detail(detail)
        .with_error_kind(ErrorKind::Upload)
    }

    pub(crate) fn from_multipart(err: &MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::payload_too_large("upload exceeds the request body limit")
        } else {
            Self::bad_upload(format!("malformed multipart body: {}", err.body_text()))
        }
    }

    pub(crate) fn from_multipart_rejection(rejection: &MultipartRejection) -> Self {
        Self::bad_upload(rejection.body_text())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let kind = err.kind();
        match err {
            PipelineError::Upload { reason } => match reason {
                UploadRejection::MissingFile => Self::bad_upload(format!(
                    "a file in the multipart field '{UPLOAD_FIELD}' is required"
                )),
                UploadRejection::EmptyStream => Self::bad_upload("the uploaded file is empty"),
                UploadRejection::TooLarge { limit } => {
                    Self::payload_too_large(format!("uploads are limited to {limit} bytes"))
                }
            },
            PipelineError::UploadStream { source } => {
                match source.downcast_ref::<MultipartError>() {
                    Some(multipart) => Self::from_multipart(multipart),
                    None => Self::bad_upload("failed to read the uploaded file"),
                }
            }
            PipelineError::UploadWrite { .. } => {
                Self::bad_upload("failed to store the uploaded file")
            }
            PipelineError::Worker { source } => worker_problem(&source).with_error_kind(kind),
            PipelineError::NotFound { .. } => Self::new(
                StatusCode::BAD_GATEWAY,
                PROBLEM_RESULT_MISSING,
                "colorization produced no result",
            )
            .with_detail("the worker reported success but no output file was found")
            .with_error_kind(kind),
            PipelineError::ResultTooLarge { limit, .. } => {
                Self::internal(format!("the colorized image exceeds {limit} bytes"))
                    .with_error_kind(kind)
            }
            PipelineError::Io { .. } => {
                Self::internal("failed to read the colorized image").with_error_kind(kind)
            }
            PipelineError::Storage { .. } => {
                Self::internal("temporary storage is unavailable").with_error_kind(kind)
            }
        }
    }
}

fn worker_problem(err: &WorkerError) -> ApiError {
    match err {
        WorkerError::Timeout { limit } => ApiError::new(
            StatusCode::GATEWAY_TIMEOUT,
            PROBLEM_TIMEOUT,
            "colorization timed out",
        )
        .with_detail(format!(
            "image colorization exceeded {}s",
            limit.as_secs_f64()
        )),
        WorkerError::Exit { code: Some(code), .. } => ApiError::new(
            StatusCode::BAD_GATEWAY,
            PROBLEM_WORKER,
            "colorization failed",
        )
        .with_detail(format!("image colorization failed with code: {code}")),
        WorkerError::Exit { code: None, .. } => ApiError::new(
            StatusCode::BAD_GATEWAY,
            PROBLEM_WORKER,
            "colorization failed",
        )
        .with_detail("image colorization was terminated by a signal"),
        WorkerError::Spawn { .. } | WorkerError::Wait { .. } => ApiError::new(
            StatusCode::BAD_GATEWAY,
            PROBLEM_WORKER,
            "colorization failed",
        )
        .with_detail("the colorization worker could not be run"),
        WorkerError::OutputDir { .. } => ApiError::internal("temporary storage is unavailable"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
            error_kind: self.error_kind.map(|kind| kind.as_str().to_string()),
        };
        (self.status, Json(body)).into_response()
    }
}
