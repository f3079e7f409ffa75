//! Offline asset cache.
//!
//! Keeps one versioned generation of the application's static assets:
//! - Install fetches the whole manifest, all-or-nothing
//! - Activate evicts every other generation
//! - Fetch goes to the network first and falls back to the active
//!   generation only when the network produced no response at all

mod http;
mod layer;
mod storage;
mod traits;

pub use http::HttpFetcher;
pub use layer::OfflineCache;
pub use storage::SqliteAssetStorage;
pub use traits::ServedFrom;
