use async_trait::async_trait;
use std::fmt::Debug;

use crate::{config::Settings, model::CurrentConditions, source::wunderground::WundergroundSource};

pub mod wunderground;

/// Supplier of station observations.
///
/// A successful fetch guarantees the observation is recent and carries its
/// epoch; instrument groups are either complete or absent.
#[async_trait]
pub trait ObservationSource: Send + Sync + Debug {
    async fn fetch_conditions(&self) -> anyhow::Result<CurrentConditions>;
}

/// Construct the Weather Underground source from validated settings.
pub fn source_from_settings(settings: &Settings) -> anyhow::Result<Box<dyn ObservationSource>> {
    let source = WundergroundSource::new(&settings.api_key, &settings.pws_name)?;
    Ok(Box::new(source))
}
