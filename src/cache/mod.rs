// Response cache module
// Author: kelexine (https://github.com/kelexine)

mod fingerprint;
pub mod models;
mod store;

pub use fingerprint::{fingerprint, FingerprintKey, KeyPolicy};
pub(crate) use fingerprint::normalize;
pub use models::{CacheConfig, CacheEntry, CacheStats};
pub use store::ResponseCache;
