//! Reference-data cache.
//!
//! Users, groups, work locations and positions change slowly and are shared
//! by every subunit, so each list is cached for a fixed ttl:
//!
//! ```toml
//! [cache]
//! reference_ttl_secs = 300
//! scope = "global"   # or "session"
//! ```

mod config;
pub(crate) mod lock;
mod store;

pub use config::{CacheConfig, CacheScope};
pub use store::{CacheEntry, CacheStore};
