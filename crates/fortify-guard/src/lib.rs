//! Guard combinators composing the semaphore,
//! bounded pool, circuit breaker and trackers behind a uniform
//! `Result<T>`-returning call shape. Guards are orthogonal and may be
//! stacked freely (pool ∘ semaphore ∘ breaker ∘ tracker ∘ fallback).

pub mod breaker_guard;
pub mod classifier;
pub mod fallback;
pub mod pool_guard;
pub mod semaphore_guard;
pub mod tracker;

pub use breaker_guard::{via_circuit_breaker, CircuitBreakerGuardOptions};
pub use classifier::{DefaultClassifier, ResultClassifier};
pub use fallback::{via_fallback, FallbackOptions};
pub use pool_guard::{via_pool, PoolGuardOptions};
pub use semaphore_guard::{via_semaphore, via_semaphore_with_timeout, SemaphoreGuardOptions};
pub use tracker::{via_latency_tracker, via_success_failure_tracker};
