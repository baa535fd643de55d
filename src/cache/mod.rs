//! Persistent resolution cache
//!
//! Remembers digests across runs, keyed by `(token, version)`.
//!
//! # Entry lifetime
//!
//! | Version | Cached value | Next run |
//! |---------|--------------|----------|
//! | pinned | digest | reused forever |
//! | `latest` | digest | oracle asked again |
//! | any | `error` | reused until forgotten or pruned |

pub mod entry;
pub mod store;

pub use entry::{CacheEntry, CacheKey};
pub use store::ResolutionCache;
