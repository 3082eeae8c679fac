//! Common test utilities and fixtures.

pub mod proxy;
pub mod server;

#[allow(unused_imports)]
pub use proxy::*;
#[allow(unused_imports)]
pub use server::*;
