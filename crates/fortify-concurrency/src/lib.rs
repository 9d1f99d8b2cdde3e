//! Counting/binary semaphore and bounded worker pool underlying the
//! `via_semaphore`/`via_pool` guards.

pub mod pool;
pub mod semaphore;
mod task;

pub use pool::{BoundedPool, BoundedPoolOptions};
pub use semaphore::Semaphore;
pub use task::TaskHandle;
