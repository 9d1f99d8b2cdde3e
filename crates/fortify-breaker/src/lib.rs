//! Fault detectors, the half-open retry resolver, and the circuit
//! breaker that couples them.

pub mod breaker;
pub mod detector;
pub mod retry;

pub use breaker::{CircuitBreaker, CircuitBreakerBuilder};
pub use detector::{DiscreteWindowFaultDetector, FaultDetector, RollingWindowFaultDetector, SerialFaultDetector};
pub use retry::HalfOpenRetryResolver;
