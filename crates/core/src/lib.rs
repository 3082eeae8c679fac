//! Core domain types and shared logic for invoicer.
//!
//! This crate defines the pieces every other crate agrees on:
//! - Tenant identifiers for the multi-tenant deployment
//! - Invoice totals (balance due, gross and net pay)
//! - Deployment and server configuration

pub mod config;
pub mod error;
pub mod invoice;
pub mod tenant;

pub use error::{Error, Result};
pub use invoice::{InvoiceTotals, MAX_AMOUNT, format_currency, parse_amount, round_cents};
pub use tenant::TenantId;

/// Default per-tenant database ceiling: 10 MiB
pub const DEFAULT_TENANT_QUOTA_BYTES: u64 = 10 * 1024 * 1024;

/// File extension used for tenant database files.
pub const TENANT_DATABASE_EXTENSION: &str = "db";
