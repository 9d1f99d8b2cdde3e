use std::time::Duration;

/// The units the external interface recognizes for duration values.
/// Deliberately does **not** parse these from strings; callers
/// construct `Duration` values in code via [`duration_of`]. Serializable
/// behind the `serde` feature so a host config struct can embed a
/// `(time, unit)` pair directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
    Millis,
    Micros,
    Nanos,
}

/// Builds a [`std::time::Duration`] from a `(time, unit)` pair, the
/// shape external callers pass to every constructor that takes a
/// duration (pool keep-alive, fault-detector windows, retry delays).
pub fn duration_of(time: u64, unit: TimeUnit) -> Duration {
    match unit {
        TimeUnit::Days => Duration::from_secs(time.saturating_mul(86_400)),
        TimeUnit::Hours => Duration::from_secs(time.saturating_mul(3_600)),
        TimeUnit::Minutes => Duration::from_secs(time.saturating_mul(60)),
        TimeUnit::Seconds => Duration::from_secs(time),
        TimeUnit::Millis => Duration::from_millis(time),
        TimeUnit::Micros => Duration::from_micros(time),
        TimeUnit::Nanos => Duration::from_nanos(time),
    }
}
