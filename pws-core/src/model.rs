use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Flat attribute map handed to the metric sink, keyed by output field name.
pub type AttributeMap = BTreeMap<String, FieldValue>;

/// A single scalar taken from an observation.
///
/// The conditions API is inconsistent about types: the same attribute may
/// arrive as a JSON number on one station and as a quoted string on another.
/// Values are kept as received until [`crate::normalize`] coerces them.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Interpret the value as a whole number of Unix seconds.
    pub fn as_unix_seconds(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            FieldValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Float(f64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Integer(i) => serializer.serialize_i64(*i),
            FieldValue::Float(f) => serializer.serialize_f64(*f),
            FieldValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldValueVisitor;

        impl de::Visitor<'_> for FieldValueVisitor {
            type Value = FieldValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number or a string")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<FieldValue, E> {
                Ok(FieldValue::Text(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<FieldValue, E> {
                Ok(FieldValue::Integer(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<FieldValue, E> {
                Ok(i64::try_from(v).map_or(FieldValue::Float(v as f64), FieldValue::Integer))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<FieldValue, E> {
                Ok(FieldValue::Float(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<FieldValue, E> {
                Ok(FieldValue::Text(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<FieldValue, E> {
                Ok(FieldValue::Text(v))
            }

            // Some stations send `null` for attributes they do not measure.
            fn visit_unit<E: de::Error>(self) -> Result<FieldValue, E> {
                Ok(FieldValue::Text(String::new()))
            }
        }

        deserializer.deserialize_any(FieldValueVisitor)
    }
}

/// Top-level body of a `conditions` API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    #[serde(rename = "current_observation")]
    pub observation: WeatherResponse,
    #[serde(default)]
    pub response: ApiStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub version: String,
    #[serde(default, rename = "termsofService")]
    pub terms_of_service: String,
    #[serde(default)]
    pub error: ApiError,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

impl ApiError {
    pub fn is_set(&self) -> bool {
        !self.kind.is_empty() || !self.description.is_empty()
    }
}

/// A single station observation.
///
/// The location groups and the timestamp are always sent. Every other group
/// depends on the instruments the station carries and is either sent in full
/// or not at all, so each one is an `Option` flattened into the same object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherResponse {
    #[serde(default)]
    pub observation_location: ObservationLocation,
    #[serde(default)]
    pub display_location: DisplayLocation,
    #[serde(rename = "weather", default)]
    pub description: Option<FieldValue>,
    #[serde(flatten)]
    pub temperature: Option<Temperature>,
    #[serde(flatten)]
    pub precipitation: Option<Precipitation>,
    #[serde(flatten)]
    pub wind: Option<Wind>,
    #[serde(flatten)]
    pub windchill: Option<Windchill>,
    #[serde(flatten)]
    pub dewpoint: Option<Dewpoint>,
    #[serde(flatten)]
    pub pressure: Option<Pressure>,
    #[serde(flatten)]
    pub solar: Option<Solar>,
    #[serde(flatten)]
    pub visibility: Option<Visibility>,
    #[serde(flatten)]
    pub timestamp: ObservationTimestamp,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservationLocation {
    #[serde(default)]
    pub city: Option<FieldValue>,
    #[serde(default)]
    pub full: Option<FieldValue>,
    #[serde(default)]
    pub elevation: Option<FieldValue>,
    #[serde(default)]
    pub country: Option<FieldValue>,
    #[serde(default)]
    pub longitude: Option<FieldValue>,
    #[serde(default)]
    pub state: Option<FieldValue>,
    #[serde(default)]
    pub country_iso3166: Option<FieldValue>,
    #[serde(default)]
    pub latitude: Option<FieldValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayLocation {
    #[serde(default)]
    pub city: Option<FieldValue>,
    #[serde(default)]
    pub full: Option<FieldValue>,
    #[serde(default)]
    pub magic: Option<FieldValue>,
    #[serde(default)]
    pub state_name: Option<FieldValue>,
    #[serde(default)]
    pub zip: Option<FieldValue>,
    #[serde(default)]
    pub country: Option<FieldValue>,
    #[serde(default)]
    pub longitude: Option<FieldValue>,
    #[serde(default)]
    pub state: Option<FieldValue>,
    #[serde(default)]
    pub wmo: Option<FieldValue>,
    #[serde(default)]
    pub country_iso3166: Option<FieldValue>,
    #[serde(default)]
    pub latitude: Option<FieldValue>,
    #[serde(default)]
    pub elevation: Option<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    #[serde(rename = "temperature_string")]
    pub description: FieldValue,
    #[serde(rename = "heat_index_string")]
    pub heat_index_string: FieldValue,
    #[serde(rename = "temp_f")]
    pub fahrenheit: FieldValue,
    #[serde(rename = "temp_c")]
    pub celsius: FieldValue,
    #[serde(rename = "feelslike_f")]
    pub feels_like_fahrenheit: FieldValue,
    #[serde(rename = "heat_index_f")]
    pub heat_index_fahrenheit: FieldValue,
    #[serde(rename = "feelslike_c")]
    pub feels_like_celsius: FieldValue,
    #[serde(rename = "heat_index_c")]
    pub heat_index_celsius: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Precipitation {
    #[serde(rename = "precip_today_string")]
    pub description: FieldValue,
    #[serde(rename = "precip_today_metric")]
    pub today_metric: FieldValue,
    #[serde(rename = "precip_today_in")]
    pub today_in: FieldValue,
    #[serde(rename = "precip_1hr_string")]
    pub one_hour_string: FieldValue,
    #[serde(rename = "precip_1hr_metric")]
    pub one_hour_metric: FieldValue,
    #[serde(rename = "precip_1hr_in")]
    pub one_hour_in: FieldValue,
    pub relative_humidity: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    #[serde(rename = "wind_string")]
    pub description: FieldValue,
    #[serde(rename = "wind_dir")]
    pub direction: FieldValue,
    #[serde(rename = "wind_degrees")]
    pub degrees: FieldValue,
    #[serde(rename = "wind_mph")]
    pub mph: FieldValue,
    #[serde(rename = "wind_gust_mph")]
    pub gust_mph: FieldValue,
    #[serde(rename = "wind_kph")]
    pub kph: FieldValue,
    #[serde(rename = "wind_gust_kph")]
    pub gust_kph: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Windchill {
    #[serde(rename = "windchill_string")]
    pub description: FieldValue,
    #[serde(rename = "windchill_f")]
    pub fahrenheit: FieldValue,
    #[serde(rename = "windchill_c")]
    pub celsius: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dewpoint {
    #[serde(rename = "dewpoint_string")]
    pub description: FieldValue,
    #[serde(rename = "dewpoint_f")]
    pub fahrenheit: FieldValue,
    #[serde(rename = "dewpoint_c")]
    pub celsius: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pressure {
    #[serde(rename = "pressure_trend")]
    pub trend: FieldValue,
    #[serde(rename = "pressure_in")]
    pub inches: FieldValue,
    #[serde(rename = "pressure_mb")]
    pub millibars: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solar {
    #[serde(rename = "solarradiation")]
    pub radiation: FieldValue,
    #[serde(rename = "UV")]
    pub uv: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visibility {
    #[serde(rename = "visibility_km")]
    pub kilometers: FieldValue,
    #[serde(rename = "visibility_mi")]
    pub miles: FieldValue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservationTimestamp {
    #[serde(default)]
    pub observation_time: Option<FieldValue>,
    #[serde(default)]
    pub observation_epoch: Option<FieldValue>,
    #[serde(default)]
    pub observation_time_rfc822: Option<FieldValue>,
}
