//! Axum-based HTTP server exposing the generation pipeline.
//!
//! # Components
//!
//! - `handlers`: generate, analytics, health and metrics endpoints.
//! - `middleware`: request ID tracking layers.
//! - `routes`: the router that ties everything together.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod middleware;
mod routes;

pub use handlers::{GenerateBody, HealthResponse, HealthStatus};
pub use routes::{create_router, AppState};
