//! Fortify: resilience and metrics primitives for in-process fault
//! tolerance — cyclic bucket buffers and rolling recorders, fault
//! detectors, a half-open retry resolver and circuit breaker, a
//! semaphore and bounded worker pool, and the guard combinators that
//! compose them around arbitrary fallible work.
//!
//! This crate is a thin facade: it re-exports the `fortify-*` workspace
//! members under one namespace and a [`prelude`] for the common case of
//! pulling in a breaker, a guard, and the error type in one `use`.

pub use fortify_breaker as breaker;
pub use fortify_buckets as buckets;
pub use fortify_common as common;
pub use fortify_concurrency as concurrency;
pub use fortify_guard as guard;
pub use fortify_metrics as metrics;

/// The common-case imports: error taxonomy, clocks, the three guard
/// families, fault detectors, the circuit breaker, and the rolling
/// recorders.
pub mod prelude {
    pub use fortify_breaker::{
        CircuitBreaker, CircuitBreakerBuilder, DiscreteWindowFaultDetector, FaultDetector,
        HalfOpenRetryResolver, RollingWindowFaultDetector, SerialFaultDetector,
    };
    pub use fortify_common::{EventClock, Error, Result, SystemClock, VirtualClock};
    pub use fortify_concurrency::{BoundedPool, BoundedPoolOptions, Semaphore};
    pub use fortify_guard::{
        via_circuit_breaker, via_fallback, via_latency_tracker, via_pool, via_semaphore,
        via_success_failure_tracker, CircuitBreakerGuardOptions, DefaultClassifier,
        FallbackOptions, PoolGuardOptions, ResultClassifier, SemaphoreGuardOptions,
    };
    pub use fortify_metrics::{
        RollingBoolean, RollingCount, RollingMax, RollingOptions, RollingStore, RollingSum,
    };
}
