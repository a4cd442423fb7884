use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::model::CurrentConditions;

use super::ObservationSource;

const API_URL: &str = "http://api.wunderground.com/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Observations older than this many seconds are refused.
pub const MAX_OBSERVATION_AGE_SECS: i64 = 2 * 60 * 60;

#[derive(Debug, Clone)]
pub struct WundergroundSource {
    url: Url,
    http: Client,
}

impl WundergroundSource {
    pub fn new(api_key: &str, pws_name: &str) -> Result<Self> {
        let url = Url::parse(&format!("{API_URL}/{api_key}/conditions/q/pws:{pws_name}.json"))
            .context("Failed to build Weather Underground request URL")?;

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { url, http })
    }
}

#[async_trait]
impl ObservationSource for WundergroundSource {
    async fn fetch_conditions(&self) -> Result<CurrentConditions> {
        let res = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .context("Failed to send request to Weather Underground (conditions)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read Weather Underground conditions response body")?;

        if status != StatusCode::OK && status != StatusCode::NO_CONTENT {
            return Err(anyhow!(
                "Weather Underground request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        debug!(body = %body, "raw Weather Underground response");

        parse_conditions(&body, Utc::now())
    }
}

/// Decode a conditions response and check it is usable at `now`.
pub fn parse_conditions(body: &str, now: DateTime<Utc>) -> Result<CurrentConditions> {
    let conditions: CurrentConditions =
        serde_json::from_str(body).context("Failed to parse Weather Underground conditions JSON")?;

    let error = &conditions.response.error;
    if error.is_set() {
        bail!(
            "Error from Weather Underground API: type \"{}\", description \"{}\"",
            error.kind,
            error.description
        );
    }

    validate_freshness(&conditions, now)?;

    Ok(conditions)
}

fn validate_freshness(conditions: &CurrentConditions, now: DateTime<Utc>) -> Result<()> {
    let epoch = conditions
        .observation
        .timestamp
        .observation_epoch
        .as_ref()
        .ok_or_else(|| anyhow!("Weather Underground data has no observation_epoch"))?;

    let secs = epoch.as_unix_seconds().ok_or_else(|| {
        anyhow!("Weather Underground data has a malformed observation_epoch: '{epoch}'")
    })?;

    let observed = DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| anyhow!("Weather Underground observation_epoch {secs} is out of range"))?;

    let age = (now - observed).num_seconds();
    if age > MAX_OBSERVATION_AGE_SECS {
        bail!(
            "Weather Underground data is stale: observation_epoch is {} minutes old (limit {} minutes)",
            age / 60,
            MAX_OBSERVATION_AGE_SECS / 60
        );
    }

    Ok(())
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
