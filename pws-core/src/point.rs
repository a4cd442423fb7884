use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};

use crate::{
    error::ObservationError,
    model::{AttributeMap, FieldValue},
    projection::OBSERVATION_EPOCH_KEY,
};

pub const DEFAULT_MEASUREMENT: &str = "climate";
pub const SOURCE_TAG: &str = "wunderground";

/// A single timestamped measurement ready for the metric sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: AttributeMap,
    pub time: DateTime<Utc>,
}

impl Point {
    /// Assemble a point, taking its time from the `observation_epoch` field.
    pub fn new(
        measurement: impl Into<String>,
        tags: BTreeMap<String, String>,
        fields: AttributeMap,
    ) -> Result<Self, ObservationError> {
        let epoch = fields.get(OBSERVATION_EPOCH_KEY).ok_or(ObservationError::MissingTimestamp)?;
        let secs = epoch
            .as_unix_seconds()
            .ok_or_else(|| ObservationError::MalformedTimestamp(epoch.to_string()))?;
        let time =
            DateTime::<Utc>::from_timestamp(secs, 0).ok_or(ObservationError::TimestampOutOfRange(secs))?;

        Ok(Self { measurement: measurement.into(), tags, fields, time })
    }

    /// Tags attached to every point published for a station.
    pub fn station_tags(pws_name: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("source".to_string(), SOURCE_TAG.to_string()),
            ("pws_name".to_string(), pws_name.to_string()),
        ])
    }
}

/// One line of InfluxDB line protocol with second precision.
impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&escape(&self.measurement, &[',', ' ']))?;

        for (key, value) in &self.tags {
            if value.is_empty() {
                continue;
            }
            write!(f, ",{}={}", escape(key, TAG_SPECIAL), escape(value, TAG_SPECIAL))?;
        }

        let mut separator = ' ';
        for (key, value) in &self.fields {
            write!(f, "{separator}{}=", escape(key, TAG_SPECIAL))?;
            separator = ',';
            match value {
                FieldValue::Float(v) => write!(f, "{v}")?,
                FieldValue::Integer(i) => write!(f, "{i}i")?,
                FieldValue::Text(s) => write!(f, "\"{}\"", escape(s, &['"', '\\']))?,
            }
        }

        write!(f, " {}", self.time.timestamp())
    }
}

const TAG_SPECIAL: &[char] = &[',', '=', ' '];

fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            c if special.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}
