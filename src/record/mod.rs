use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

#[cfg(test)]
mod tests;

/// Stable identifier of one facility (upstream `equipmentnumber`)
pub type FacilityId = u64;

/// Operational status reported for a facility.
///
/// Anything the API sends besides ACTIVE/INACTIVE is folded into `Unknown`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FacilityState {
    Active,
    Inactive,
    #[serde(other)]
    Unknown,
}

impl FacilityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacilityState::Active => "ACTIVE",
            FacilityState::Inactive => "INACTIVE",
            FacilityState::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for FacilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic position as reported upstream
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "geocoordX", default, serialize_with = "coordinate")]
    pub x: Option<f64>,
    #[serde(rename = "geocoordY", default, serialize_with = "coordinate")]
    pub y: Option<f64>,
}

/// Whole-number coordinates are written as JSON integers (`0`, not `0.0`)
fn coordinate<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    match *value {
        Some(v) if v.fract() == 0.0 && v.abs() < MAX_EXACT => serializer.serialize_i64(v as i64),
        Some(v) => serializer.serialize_f64(v),
        None => serializer.serialize_none(),
    }
}

/// Observed status of one facility.
///
/// Field names on the wire follow the upstream API so that records can be
/// forwarded to subscribers and written to the state file unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique facility identifier (key into the state store)
    #[serde(rename = "equipmentnumber")]
    pub id: FacilityId,

    /// Facility category (e.g., "ELEVATOR", "ESCALATOR")
    #[serde(rename = "type")]
    pub kind: String,

    /// Human readable label
    #[serde(default)]
    pub description: Option<String>,

    #[serde(flatten)]
    pub location: Location,

    pub state: FacilityState,

    /// Station the facility belongs to
    #[serde(rename = "stationnumber")]
    pub group_id: u64,

    /// When the current state was first observed by us (not by the source)
    #[serde(
        rename = "timestamp",
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub observed_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Copy of this record stamped with the detection time
    pub fn observed(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = Some(at);
        self
    }
}
