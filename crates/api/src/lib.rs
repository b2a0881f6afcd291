//! HTTP API layer for pollboard.
//!
//! This crate provides the REST API and real-time streaming:
//!
//! - **Endpoints**: forms, invites, voting, results, pin resolution, admin
//! - **Extractors**: authentication
//! - **Middleware**: bearer-token resolution
//! - **Streaming**: WebSocket presence for form edit sessions
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod streaming;

pub use endpoints::router;
pub use middleware::AppState;
