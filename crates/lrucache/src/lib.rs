//! # lrucache
//!
//! Bounded key-value cache with least-recently-used eviction.
//!
//! ## Architecture
//! - **HashMap**: AHash index from key to arena slot (O(1) lookup)
//! - **LRU List**: doubly-linked list threaded through a node arena, bounded
//!   by two sentinel slots (O(1) promotion and eviction)
//! - **Shared handle**: one mutex around the whole cache for multi-threaded hosts
//!
//! Capacity is validated at construction; a miss is `None`, never an error.

#![warn(missing_docs)]

mod config;
mod error;
mod lru;
mod shared;
mod stats;

pub use config::{CacheConfig, Capacity};
pub use error::{Error, Result};
pub use lru::{Iter, LruCache};
pub use shared::SharedLruCache;
pub use stats::{CacheStats, StatsSnapshot};
