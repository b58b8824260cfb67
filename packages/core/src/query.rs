//! Query model: the host's per-query request and the PI-specific payload
//! nested inside it.
//!
//! Field names follow the host wire format exactly: the outer envelope uses
//! PascalCase (`RefID`, `MaxDataPoints`, `TimeRange`, `JSON`) while the
//! nested [`PiQuery`] uses the query editor's camelCase keys. Every nested
//! field is optional on the wire and defaults to its empty value; an
//! explicit `null` reads the same as a missing field.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::QueryError;

/// `null` decodes to the field's default, like an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Half-open `[from, to)` window a query covers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    #[serde(rename = "From")]
    pub from: DateTime<Utc>,
    #[serde(rename = "To")]
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Render as the `?startTime=...&endTime=...` query-string prefix.
    ///
    /// Both ends are UTC RFC 3339 at seconds precision with a `Z` suffix,
    /// so the result never needs escaping.
    pub fn uri_component(&self) -> String {
        format!(
            "?startTime={}&endTime={}",
            self.from.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.to.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }
}

/// One query as submitted by the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    /// Host-assigned identifier; results are keyed by it.
    #[serde(rename = "RefID")]
    pub ref_id: String,

    /// Mode label chosen in the editor. Informational only: the URI shape is
    /// driven by the flags in [`PiQuery`].
    #[serde(rename = "QueryType", default, deserialize_with = "null_as_default")]
    pub query_type: String,

    /// Point-count hint from the host panel.
    #[serde(rename = "MaxDataPoints", default, deserialize_with = "null_as_default")]
    pub max_data_points: u32,

    /// Outer polling interval in nanoseconds.
    #[serde(rename = "Interval", default, deserialize_with = "null_as_default")]
    pub interval_nanos: u64,

    #[serde(rename = "TimeRange")]
    pub time_range: TimeRange,

    /// Query-specific payload.
    #[serde(rename = "JSON", default, deserialize_with = "null_as_default")]
    pub pi: PiQuery,
}

impl Query {
    /// Decode one raw host query.
    ///
    /// Queries are decoded one at a time so that a malformed entry only
    /// costs its own RefID.
    pub fn from_value(raw: &Value) -> Result<Self, QueryError> {
        Query::deserialize(raw).map_err(|e| QueryError::InvalidQuery(e.to_string()))
    }

    /// The `RefID` of a raw query, if it has a string one.
    pub fn ref_id_of(raw: &Value) -> Option<&str> {
        raw.get("RefID").and_then(Value::as_str)
    }

    /// Sampling interval in milliseconds.
    ///
    /// The editor's `intervalMs` override wins when non-zero; otherwise the
    /// outer polling interval is used.
    pub fn interval_time_ms(&self) -> u64 {
        if self.pi.interval_ms != 0 {
            self.pi.interval_ms
        } else {
            self.interval_nanos / 1_000_000
        }
    }

    /// Number of points / intervals to request.
    ///
    /// The editor's `maxDataPoints` override wins when non-zero; otherwise
    /// the host's hint is used.
    pub fn point_count(&self) -> u32 {
        if self.pi.max_data_points != 0 {
            self.pi.max_data_points
        } else {
            self.max_data_points
        }
    }

    pub fn streaming_enabled(&self) -> bool {
        self.pi.enable_streaming.enable
    }

    /// Calculations are never streamed, whatever the streaming toggle says.
    pub fn is_streamable(&self) -> bool {
        !self.pi.is_expression() && self.streaming_enabled()
    }
}

/// An on/off switch as the editor serialises it: `{ "enable": true }`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Toggle {
    #[serde(default, deserialize_with = "null_as_default")]
    pub enable: bool,
}

/// Recorded-values toggle with its (currently unused) editor-side cap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecordedValues {
    #[serde(default, deserialize_with = "null_as_default")]
    pub enable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub max_number: u32,
}

/// Value half of a label/value pair coming from an editor dropdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SelectionValue {
    #[serde(default, deserialize_with = "null_as_default")]
    pub expandable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(rename = "webId", default, skip_serializing_if = "Option::is_none")]
    pub web_id: Option<String>,
}

/// A label/value pair as produced by the editor's dropdowns. Used for
/// summary types, attributes and element segments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Selection {
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: SelectionValue,
}

/// Summary (aggregation) settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct QuerySummary {
    /// `summaryBasis`, e.g. `TimeWeighted` or `EventWeighted`.
    #[serde(deserialize_with = "null_as_default")]
    pub basis: String,
    /// `summaryDuration`; empty means the default of `30s`.
    #[serde(deserialize_with = "null_as_default")]
    pub interval: String,
    #[serde(deserialize_with = "null_as_default")]
    pub nodata: String,
    /// One `summaryType` parameter is emitted per entry.
    #[serde(deserialize_with = "null_as_default")]
    pub types: Vec<Selection>,
}

/// Reference to the datasource a query was authored against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DatasourceRef {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uid: String,
}

/// The PI-specific payload of a [`Query`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PiQuery {
    /// `<base>;<leaf>;<leaf>...`, see [`crate::target`].
    #[serde(deserialize_with = "null_as_default")]
    pub target: String,

    /// Calculation expression. Non-empty switches the query to `/calculation`.
    #[serde(deserialize_with = "null_as_default")]
    pub expression: String,

    #[serde(deserialize_with = "null_as_default")]
    pub interpolate: Toggle,
    #[serde(deserialize_with = "null_as_default")]
    pub recorded_values: RecordedValues,

    #[serde(rename = "EnableStreaming", deserialize_with = "null_as_default")]
    pub enable_streaming: Toggle,

    #[serde(deserialize_with = "null_as_default")]
    pub summary: QuerySummary,

    /// Sampling interval override in milliseconds; `0` means "use the outer interval".
    #[serde(deserialize_with = "null_as_default")]
    pub interval_ms: u64,

    /// Point-count override; `0` means "use the host hint".
    #[serde(deserialize_with = "null_as_default")]
    pub max_data_points: u32,

    /// `true` for PI points (`\`-joined paths), `false` for AF attributes (`|`-joined).
    #[serde(deserialize_with = "null_as_default")]
    pub is_pi_point: bool,

    // Editor state only; carried so a query round-trips unchanged.
    #[serde(deserialize_with = "null_as_default")]
    pub regex: Toggle,
    #[serde(deserialize_with = "null_as_default")]
    pub digital_states: Toggle,
    #[serde(deserialize_with = "null_as_default")]
    pub element_path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub hide: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub ref_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub datasource: DatasourceRef,
    #[serde(deserialize_with = "null_as_default")]
    pub datasource_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub attributes: Vec<Selection>,
    #[serde(deserialize_with = "null_as_default")]
    pub segments: Vec<Selection>,
}

impl PiQuery {
    pub fn is_expression(&self) -> bool {
        !self.expression.is_empty()
    }

    /// A summary needs both a basis and at least one summary type.
    pub fn is_summary(&self) -> bool {
        !self.summary.basis.is_empty() && !self.summary.types.is_empty()
    }

    pub fn summary_duration(&self) -> &str {
        if self.summary.interval.is_empty() {
            "30s"
        } else {
            &self.summary.interval
        }
    }

    pub fn is_interpolated(&self) -> bool {
        self.interpolate.enable
    }

    pub fn is_recorded_values(&self) -> bool {
        self.recorded_values.enable
    }
}
