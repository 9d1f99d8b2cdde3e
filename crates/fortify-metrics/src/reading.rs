use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::percentile::SampleMetrics;

/// Ad hoc `{ "count": i64, "fault": bool }` readout used internally by
/// fault detectors, which share no configured key name worth a typed
/// field. The rolling recorders below return one of the named,
/// strongly typed readouts instead.
pub type Reading = IndexMap<String, Value>;

/// [`crate::recorder::RollingSum`]/[`crate::recorder::RollingCount`] readout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingCountReading {
    pub key: String,
    pub value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<i64>>,
}

/// [`crate::recorder::RollingBoolean`] readout: independent truthy/falsy
/// tallies, each with its own optional per-bucket breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingBooleanReading {
    pub truthy_key: String,
    pub truthy: i64,
    pub falsy_key: String,
    pub falsy: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truthy_buckets: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub falsy_buckets: Option<Vec<i64>>,
}

/// [`crate::recorder::RollingMax`] readout. `value` is `None` when the
/// window hasn't observed a sample yet, distinct from a max of zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingMaxReading {
    pub key: String,
    pub value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<i64>>,
}

/// [`crate::recorder::RollingStore`] readout. `value` is `None` for an
/// empty window; otherwise the full `{min, mean, median, max,
/// percentiles}` tuple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingPercentileReading {
    pub key: String,
    pub value: Option<SampleMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<i64>>,
}
