use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::{config::InfluxDbSettings, point::Point};

use super::MetricSink;

/// Precision of the timestamps in the line protocol written by [`Point`].
pub const PRECISION: &str = "s";

/// Client for the InfluxDB 1.x `/write` endpoint.
#[derive(Debug, Clone)]
pub struct InfluxDbSink {
    write_url: Url,
    credentials: Option<(String, String)>,
    http: Client,
}

impl InfluxDbSink {
    pub fn new(settings: &InfluxDbSettings) -> Result<Self> {
        Ok(Self {
            write_url: write_url(&settings.host, &settings.database),
            credentials: settings
                .username
                .clone()
                .map(|user| (user, settings.password.clone().unwrap_or_default())),
            http: Client::builder().build().context("Failed to build HTTP client")?,
        })
    }
}

fn write_url(host: &Url, database: &str) -> Url {
    let mut url = host.clone();
    url.set_path("/write");
    url.set_query(None);
    url.query_pairs_mut().append_pair("db", database).append_pair("precision", PRECISION);
    url
}

#[async_trait]
impl MetricSink for InfluxDbSink {
    async fn write_point(&self, point: &Point) -> Result<()> {
        let line = point.to_string();
        debug!(line = %line, "writing point to InfluxDB");

        let mut req = self.http.post(self.write_url.clone()).body(line);
        if let Some((user, password)) = &self.credentials {
            req = req.basic_auth(user, Some(password));
        }

        let res = req.send().await.context("Failed to send write request to InfluxDB")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!(
                "InfluxDB write failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        Ok(())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
