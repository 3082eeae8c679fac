//! HTTP request handlers.

pub mod auth;
pub mod common;
pub mod deliverables;
pub mod html;
pub mod invoices;
pub mod limit;
pub mod projects;

pub use auth::*;
pub use common::*;
pub use deliverables::*;
pub use invoices::*;
pub use limit::*;
pub use projects::*;
