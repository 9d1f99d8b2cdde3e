//! Shared substrate for the `fortify-*` resilience crates: the error
//! taxonomy, the clock abstraction used by fault detectors,
//! the retry resolver and latency trackers, and the duration/unit
//! values accepted by every constructor.

pub mod clock;
pub mod duration;
pub mod error;

pub use clock::{EventClock, MonotonicClock, MonotonicInstant, SystemClock, VirtualClock};
pub use duration::{duration_of, TimeUnit};
pub use error::{Error, Result};
