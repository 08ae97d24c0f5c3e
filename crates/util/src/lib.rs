//! HTTP execution, credential storage and log-safety helpers shared by the
//! OdooRPC client and CLI.

pub mod http;
pub mod keystore;
mod redact;

pub use redact::redact_sensitive;
