use std::error::Error as StdError;

use snafu::Snafu;

/// The error taxonomy shared by every guard and constructor in the
/// workspace. Variants are kinds, not wrappers around a single foreign
/// error type: each guard converts whatever it denied or timed out on
/// into one of these before handing it back to the caller.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// A circuit breaker denied the call because it is tripped and the
    /// retry resolver did not grant a probe.
    #[snafu(display("circuit breaker '{name}' is open"))]
    CircuitBreakerOpen { name: String },

    /// A semaphore had no permit available (or was shut down).
    #[snafu(display("semaphore '{name}' rejected the acquire"))]
    SemaphoreRejected { name: String },

    /// The bounded pool's intake queue and worker set were both
    /// saturated, or the pool has been shut down.
    #[snafu(display("thread pool '{name}' rejected the submission"))]
    ThreadPoolRejected { name: String },

    /// A task running under a guard exceeded its declared timeout.
    #[snafu(display("operation timed out after {elapsed_ms}ms (limit {limit_ms}ms)"))]
    OperationTimedOut { elapsed_ms: u64, limit_ms: u64 },

    /// A task raised a caller-supplied exception; the original error is
    /// preserved as the `source()`.
    #[snafu(display("task raised an exception"))]
    ExceptionOccurred {
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Construction-time validation failed (e.g. a rolling window whose
    /// duration does not evenly divide its bucket interval).
    #[snafu(display("invalid argument '{param_name}': {reason}"))]
    InvalidArgument {
        param_name: &'static str,
        reason: String,
    },

    /// An arity-0 `record!` was attempted on a collector that requires a
    /// value (e.g. calling the sum recorder's bump without an amount).
    #[snafu(display("unsupported operation: {what}"))]
    UnsupportedOperation { what: &'static str },
}

impl Error {
    pub fn exception<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Error::ExceptionOccurred {
            source: Box::new(source),
        }
    }

    pub fn invalid_argument(param_name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            param_name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
