//! REST API module
//!
//! HTTP server, routes, middleware and request/response models for the
//! import and metadata endpoints.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use middleware::{trace_id_middleware, TraceId, TRACE_ID_HEADER};
pub use server::ApiServer;
