use thiserror::Error;

/// Failures while turning an observation into a point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservationError {
    #[error("missing observation_epoch timestamp in observation")]
    MissingTimestamp,

    #[error("malformed observation_epoch '{0}': expected whole Unix seconds")]
    MalformedTimestamp(String),

    #[error("observation_epoch {0} is outside the representable time range")]
    TimestampOutOfRange(i64),
}
