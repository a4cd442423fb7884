use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    model::{AttributeMap, CurrentConditions, WeatherResponse},
    normalize::normalize,
    point::{DEFAULT_MEASUREMENT, Point},
    projection::project,
    schema::FieldNaming,
    sink::MetricSink,
    source::ObservationSource,
};

/// What to extract from an observation and how to label it.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub pws_name: String,
    pub fields: Vec<String>,
    pub naming: FieldNaming,
}

/// Fetch on a separate task and hand the result back through its join handle.
pub async fn fetch_observation(source: Arc<dyn ObservationSource>) -> Result<CurrentConditions> {
    tokio::spawn(async move { source.fetch_conditions().await })
        .await
        .context("Observation fetch task failed")?
}

/// Projected and normalised fields for `observation`.
pub fn build_fields(request: &PublishRequest, observation: &WeatherResponse) -> Result<AttributeMap> {
    let fields = project(request.fields.as_slice(), observation, request.naming)?;
    Ok(normalize(fields))
}

/// Assemble the point published for `observation`.
pub fn build_point(request: &PublishRequest, observation: &WeatherResponse) -> Result<Point> {
    let fields = build_fields(request, observation)?;
    let point = Point::new(DEFAULT_MEASUREMENT, Point::station_tags(&request.pws_name), fields)?;
    Ok(point)
}

/// Fetch one observation and write it to `sink` as a single point.
pub async fn publish(
    source: Arc<dyn ObservationSource>,
    sink: &dyn MetricSink,
    request: &PublishRequest,
) -> Result<Point> {
    let conditions = fetch_observation(source).await?;
    let point = build_point(request, &conditions.observation)?;

    sink.write_point(&point).await?;

    info!(
        pws_name = %request.pws_name,
        fields = point.fields.len(),
        time = %point.time,
        "published observation"
    );

    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::FieldValue, projection::OBSERVATION_EPOCH_KEY,
        source::wunderground::parse_conditions,
    };
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    const SAMPLE: &str = include_str!("../fixtures/conditions.json");

    #[derive(Debug)]
    struct FixtureSource;

    #[async_trait]
    impl ObservationSource for FixtureSource {
        async fn fetch_conditions(&self) -> Result<CurrentConditions> {
            let now = DateTime::<Utc>::from_timestamp(1340843233 + 60, 0).unwrap();
            parse_conditions(SAMPLE, now)
        }
    }

    #[derive(Debug)]
    struct FailingSource;

    #[async_trait]
    impl ObservationSource for FailingSource {
        async fn fetch_conditions(&self) -> Result<CurrentConditions> {
            Err(anyhow!("connection refused"))
        }
    }

    #[derive(Debug, Default)]
    struct RecordingSink {
        lines: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MetricSink for RecordingSink {
        async fn write_point(&self, point: &Point) -> Result<()> {
            self.lines.lock().unwrap().push(point.to_string());
            Ok(())
        }
    }

    fn request(fields: &[&str], naming: FieldNaming) -> PublishRequest {
        PublishRequest {
            pws_name: "KCASANFR58".into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            naming,
        }
    }

    #[tokio::test]
    async fn publishes_normalized_point() {
        let sink = RecordingSink::default();
        let req = request(
            &["temp_f", "relative_humidity", "wind_dir", "pressure_in", "solarradiation", "nope"],
            FieldNaming::Alias,
        );

        let point = publish(Arc::new(FixtureSource), &sink, &req).await.expect("publish succeeds");

        assert_eq!(point.time.timestamp(), 1340843233);
        assert_eq!(point.fields["temp_f"], FieldValue::Float(66.3));
        assert_eq!(point.fields["relative_humidity"], FieldValue::Float(65.0));
        assert_eq!(point.fields["wind_dir"], FieldValue::from("NNW"));
        assert_eq!(point.fields["pressure_in"], FieldValue::Float(29.93));
        assert_eq!(point.fields["solarradiation"], FieldValue::from("--"));
        assert_eq!(point.fields[OBSERVATION_EPOCH_KEY], FieldValue::Float(1340843233.0));
        assert!(!point.fields.contains_key("nope"));

        let lines = sink.lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("climate,pws_name=KCASANFR58,source=wunderground "));
        assert!(lines[0].ends_with(" 1340843233"));
    }

    #[tokio::test]
    async fn native_naming_flows_through() {
        let sink = RecordingSink::default();
        let req = request(&["wind_kph", "description"], FieldNaming::Native);

        let point = publish(Arc::new(FixtureSource), &sink, &req).await.unwrap();

        assert_eq!(point.fields["kph"], FieldValue::Float(35.4));
        assert_eq!(point.fields["description"], FieldValue::from("Partly Cloudy"));
    }

    #[tokio::test]
    async fn fetch_failure_writes_nothing() {
        let sink = RecordingSink::default();
        let err = publish(Arc::new(FailingSource), &sink, &request(&["temp_f"], FieldNaming::Alias))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("connection refused"));
        assert!(sink.lines.lock().unwrap().is_empty());
    }

    #[test]
    fn absent_group_is_skipped_end_to_end() {
        let now = DateTime::<Utc>::from_timestamp(1340843233, 0).unwrap();
        let conditions = parse_conditions(SAMPLE, now).unwrap();
        let fields =
            build_fields(&request(&["visibility_km", "UV"], FieldNaming::Alias), &conditions.observation)
                .unwrap();

        assert!(!fields.contains_key("visibility_km"));
        assert_eq!(fields["UV"], FieldValue::Float(5.0));
    }
}
