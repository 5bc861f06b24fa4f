//! Wire types for the JSON (non-GeoJSON) backend endpoints.
//!
//! The backend is loose about numeric types: counts may arrive as floats,
//! values as numeric strings, and any field may be `null`. Decoding here is
//! correspondingly lenient so one odd field never rejects a whole response.

use foundation::LatLngBounds;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::ApiError;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn decode<T>(&self, policy: StatusPolicy) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        decode_json(self.status, &self.body, policy)
    }
}

/// Headline figures from `/summary`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Summary {
    #[serde(deserialize_with = "lenient_f64")]
    pub total_protection_value: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub protection_percentage: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub affected_buildings: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_storage_m3: Option<f64>,
}

/// One row of `/damage_by_category`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CategoryTotal {
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub count: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_damage: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_protection: Option<f64>,
}

/// Response of `/postcode/search`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PostcodeSearchResponse {
    pub error: Option<String>,
    pub found: bool,
    pub postcode: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub affected_buildings: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_damage: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub protection_value: Option<f64>,
    #[serde(deserialize_with = "lenient_bounds")]
    pub bounds: Option<LatLngBounds>,
    pub district: Option<String>,
    pub sector: Option<String>,
    pub message: Option<String>,
    pub buildings: Option<Vec<BuildingSummary>>,
}

impl PostcodeSearchResponse {
    /// Affected building count, zero when absent.
    pub fn affected_count(&self) -> u64 {
        self.affected_buildings
            .filter(|v| v.is_finite() && *v > 0.0)
            .map(|v| v.round() as u64)
            .unwrap_or(0)
    }

    /// Backend-reported domain error, ignoring blank strings.
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Per-building entry in a postcode search result.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuildingSummary {
    #[serde(deserialize_with = "lenient_i64")]
    pub damage_id: Option<i64>,
    pub building_category: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub damage_2024_pound: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub protection_value_pound: Option<f64>,
}

/// How a non-2xx status is treated when decoding a body.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Non-2xx is an error regardless of body.
    RequireOk,
    /// The endpoint reports domain errors in a JSON body with a non-2xx
    /// status; decode the body anyway.
    AcceptErrorBody,
}

/// Decodes a JSON response body according to `policy`.
pub fn decode_json<T>(status: u16, body: &str, policy: StatusPolicy) -> Result<T, ApiError>
where
    T: for<'de> Deserialize<'de>,
{
    let ok = (200..300).contains(&status);
    if !ok && policy == StatusPolicy::RequireOk {
        return Err(ApiError::Status {
            status,
            body: body.to_string(),
        });
    }
    serde_json::from_str(body).map_err(|e| {
        if ok {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Status {
                status,
                body: body.to_string(),
            }
        }
    })
}

/// Parses a raw JSON value as a number, accepting numeric strings.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value))
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|v| v as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_bounds<'de, D>(deserializer: D) -> Result<Option<LatLngBounds>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value::<LatLngBounds>(value)
        .ok()
        .filter(LatLngBounds::is_valid))
}
