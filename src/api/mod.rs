//! HTTP API for the backup dashboard
//!
//! Provides:
//! - Entry listing, filtering and statistics
//! - Abandoned and failed submission windows
//! - JSON/CSV export
//! - Ingest endpoint for trackers pushing entries

pub mod server;

pub use server::{build_router, ApiServer, ApiServerConfig, AppState};
