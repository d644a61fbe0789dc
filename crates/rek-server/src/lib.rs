//! HTTP server for the rek stock ledger.
//!
//! Exposes reference data, stock documents, adjustments, inventories, the
//! audit log and reports as JSON over axum. Ledger calls run on the blocking
//! pool; errors come back as `{code, message, retryable, detail}`.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ErrorResponse, ServerError, ServerResult};
pub use handler::ACTOR_HEADER;
pub use server::RekServer;
pub use state::{AppState, OPENING_RECEIPT};
