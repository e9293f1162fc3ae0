use super::{get_body, usable_rate, RateSource, SourceId};
use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const ER_API_URL: &str = "https://open.er-api.com/v6/latest/USD";

/// open.er-api.com latest rates with USD as base, EUR leg.
#[derive(Debug, Clone)]
pub struct ErApiSource {
    client: Client,
    url: String,
}

impl ErApiSource {
    pub fn new(client: Client) -> Self {
        Self::with_url(client, ER_API_URL)
    }

    pub fn with_url(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestRates {
    result: String,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

fn parse_rate(body: &[u8]) -> Result<f64, String> {
    let latest: LatestRates = serde_json::from_slice(body)
        .map_err(|e| format!("er-api: parse JSON failed: {e}"))?;
    if latest.result != "success" {
        return Err(format!("er-api: result is {:?}", latest.result));
    }
    latest
        .rates
        .get("EUR")
        .copied()
        .ok_or_else(|| "er-api: EUR missing from rates".to_string())
}

#[async_trait]
impl RateSource for ErApiSource {
    fn id(&self) -> SourceId {
        SourceId::Fiat
    }

    fn name(&self) -> &str {
        "open-er-api"
    }

    async fn fetch(&self, timeout: Duration) -> Result<f64, FetchError> {
        let body = get_body(&self.client, self.id(), &self.url, "application/json", timeout).await?;
        let rate = parse_rate(&body).map_err(|e| FetchError::decode(self.id(), e))?;
        usable_rate(self.id(), rate)
    }
}
