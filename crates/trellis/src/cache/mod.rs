//! The two cache tiers and the engine that orchestrates them.
//!
//! - [`entry`]: TTL-stamped values and the clock they are checked against
//! - [`memory`]: per-repository in-memory tier
//! - [`persistent`]: snapshots and the bounded per-repository index kept in a
//!   [`KvStore`](trellis_store::KvStore)
//! - [`manager`]: [`GraphEngine`], the memory → persistent → incremental →
//!   full rebuild state machine

pub mod entry;
pub mod manager;
pub mod memory;
pub mod persistent;

pub use entry::{CacheEntry, ClockSource, ManualClock, SystemClock};
pub use manager::{GraphEngine, GraphSource, Resolved};
pub use memory::MemoryCache;
pub use persistent::SnapshotStore;
