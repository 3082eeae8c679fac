//! Session token signing for invoicer.
//!
//! This crate provides:
//! - HMAC-SHA256 keyed digests over issuance timestamps
//! - Opaque base64 tokens suitable for cookies
//! - Constant-time verification

pub mod error;
pub mod signer;

pub use error::{SignerError, SignerResult};
pub use signer::TokenSigner;
