//! HTTP surface modules (router, handlers, middleware).

/// Upload endpoint.
pub(crate) mod colorize;
/// Shared constants and header names.
pub(crate) mod constants;
/// Problem response helpers.
pub(crate) mod errors;
/// Health and diagnostics endpoints.
pub(crate) mod health;
/// Request id scoping and request counting.
pub(crate) mod requests;
/// Router construction and server host.
pub(crate) mod router;
