use async_trait::async_trait;
use std::fmt::Debug;

use crate::{config::InfluxDbSettings, point::Point, sink::influxdb::InfluxDbSink};

pub mod influxdb;

/// Destination for assembled points.
#[async_trait]
pub trait MetricSink: Send + Sync + Debug {
    async fn write_point(&self, point: &Point) -> anyhow::Result<()>;
}

/// Construct the InfluxDB sink from validated settings.
pub fn sink_from_settings(settings: &InfluxDbSettings) -> anyhow::Result<Box<dyn MetricSink>> {
    Ok(Box::new(InfluxDbSink::new(settings)?))
}
