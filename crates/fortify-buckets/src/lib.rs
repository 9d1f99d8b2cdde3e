//! Cyclic bucket buffers, bucket storage strategies and sharded readers.
//!
//! This crate is the rolling-metrics engine's leaf layer: a fixed-size
//! ring of buckets keyed by a
//! monotonically increasing event id, three strategies an individual
//! bucket can implement (summing, max, storing), and a sharded fan-out
//! that spreads writes across independent rings to cut contention.
//!
//! Everything above this crate — rolling recorders, fault detectors,
//! the circuit breaker — is built on top of [`sharded::ShardedCbb`].

pub mod cbb;
pub mod pending;
pub mod sharded;
pub mod store;

pub use cbb::{bucket_offset, CyclicBucketBuffer};
pub use sharded::{auto_shard_count, ShardedCbb};
pub use store::{BucketStore, MaxStore, StoringStore, SummingStore};
