//! client-core: Shared infrastructure for the workforce client crates.
pub mod config;
pub mod error;
pub mod observability;
pub mod retry;

pub use tracing;
