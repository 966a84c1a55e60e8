//! Cross-cutting helpers.
//!
//! # Submodules
//!
//! - `logging`: tracing initialization and secret redaction.
//! - `retry`: bounded retries with exponential backoff, jitter and
//!   cancellation.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
pub mod retry;
