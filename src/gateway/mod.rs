// Gateway module - resilient client for the upstream flow-execution service
//
// The flow service is externally owned and loosely documented, so every layer
// here assumes the wrong thing might be configured:
// - endpoints: derive several candidate URLs from config, most specific first
// - auth: primary header set plus alternate encodings for 401 recovery
// - executor: one URL, manual redirects, transient retries with backoff
// - extract: find answer text in whatever JSON (or text) comes back
// - client: walk candidates × encodings and return the first answer

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod executor;
pub mod extract;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ChatRequest, GatewayClient};
pub use error::GatewayError;
