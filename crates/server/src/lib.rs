//! HTTP server for invoicer.
//!
//! This crate provides:
//! - Identity resolution per deployment mode (open, password, per-visitor)
//! - Request-scoped database sessions
//! - Recovery from broken or over-quota tenant databases
//! - The project, deliverable and invoice pages

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod recovery;
pub mod routes;
pub mod state;

pub use auth::{AuthOutcome, IdentityResolver, RequestTenant, TraceId};
pub use error::{ApiError, StorageFailure};
pub use routes::create_router;
pub use state::AppState;
