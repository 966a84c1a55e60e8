// eventforge - cost-aware event title and description generator
// Author: kelexine (https://github.com/kelexine)

pub mod analytics;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod metrics;
pub mod models;
pub mod policy;
pub mod prompt;
pub mod provider;
pub mod server;
pub mod utils;
