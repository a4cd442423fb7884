//! Core library for the `pws` CLI.
//!
//! This crate defines:
//! - The Weather Underground observation schema and its field tables
//! - Projection of requested fields into a flat attribute map
//! - Numeric coercion of projected values
//! - Point assembly and the InfluxDB sink
//! - Configuration & credentials handling
//!
//! It is used by `pws-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod point;
pub mod projection;
pub mod schema;
pub mod sink;
pub mod source;

pub use config::{Config, InfluxDbSettings, Settings};
pub use error::ObservationError;
pub use model::{AttributeMap, CurrentConditions, FieldValue, WeatherResponse};
pub use normalize::normalize;
pub use pipeline::{PublishRequest, build_fields, build_point, fetch_observation, publish};
pub use point::Point;
pub use projection::{OBSERVATION_EPOCH_KEY, project};
pub use schema::{FieldNaming, field_catalog};
pub use sink::MetricSink;
pub use source::ObservationSource;
