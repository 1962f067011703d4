//! Shared HTTP constants (headers, field names, problem URIs).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const UPLOAD_FIELD: &str = "image";
/// Room for multipart framing on top of the upload limit.
pub(crate) const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

pub(crate) const PROBLEM_UPLOAD: &str = "https://recolor.dev/problems/upload";
pub(crate) const PROBLEM_PAYLOAD_TOO_LARGE: &str = "https://recolor.dev/problems/payload-too-large";
pub(crate) const PROBLEM_WORKER: &str = "https://recolor.dev/problems/worker";
pub(crate) const PROBLEM_TIMEOUT: &str = "https://recolor.dev/problems/timeout";
pub(crate) const PROBLEM_RESULT_MISSING: &str = "https://recolor.dev/problems/result-missing";
pub(crate) const PROBLEM_INTERNAL: &str = "https://recolor.dev/problems/internal";
