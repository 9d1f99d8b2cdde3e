//! Rolling recorders: thin facades over a sharded
//! cyclic bucket buffer that produce a time-windowed sum, count, max,
//! sampled percentile distribution, or truthy/falsy tally.

pub mod percentile;
pub mod reading;
pub mod recorder;

pub use percentile::{compute_sample_metrics, median_of_sorted, percentile_of_sorted, SampleMetrics};
pub use reading::{Reading, RollingBooleanReading, RollingCountReading, RollingMaxReading, RollingPercentileReading};
pub use recorder::{RollingBoolean, RollingCount, RollingMax, RollingOptions, RollingStore, RollingSum};
