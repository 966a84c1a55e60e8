//! Data models shared across the generation pipeline.
//!
//! - `request`: the immutable [`GenerationRequest`] and its builder
//! - `result`: [`GenerationResult`] and [`TokenUsage`]

// Author: kelexine (https://github.com/kelexine)

pub mod request;
pub mod result;

pub use request::{ContentKind, GenerationRequest, RequestBuilder};
pub use result::{GenerationResult, TokenUsage};
