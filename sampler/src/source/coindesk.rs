use super::{get_body, usable_rate, RateSource, SourceId};
use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const COINDESK_URL: &str = "https://api.coindesk.com/v1/bpi/currentprice/USD.json";

/// CoinDesk Bitcoin Price Index, USD leg.
#[derive(Debug, Clone)]
pub struct CoinDeskSource {
    client: Client,
    url: String,
}

impl CoinDeskSource {
    pub fn new(client: Client) -> Self {
        Self::with_url(client, COINDESK_URL)
    }

    pub fn with_url(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

// Only the field we need: { "bpi": { "USD": { "rate_float": 65000.1234, ... } } }
#[derive(Debug, Deserialize)]
struct BpiResponse {
    bpi: Bpi,
}

#[derive(Debug, Deserialize)]
struct Bpi {
    #[serde(rename = "USD")]
    usd: BpiCurrency,
}

#[derive(Debug, Deserialize)]
struct BpiCurrency {
    rate_float: f64,
}

fn parse_rate(body: &[u8]) -> Result<f64, String> {
    serde_json::from_slice::<BpiResponse>(body)
        .map(|r| r.bpi.usd.rate_float)
        .map_err(|e| format!("coindesk: parse JSON failed: {e}"))
}

#[async_trait]
impl RateSource for CoinDeskSource {
    fn id(&self) -> SourceId {
        SourceId::Crypto
    }

    fn name(&self) -> &str {
        "coindesk"
    }

    async fn fetch(&self, timeout: Duration) -> Result<f64, FetchError> {
        let body = get_body(&self.client, self.id(), &self.url, "application/json", timeout).await?;
        let rate = parse_rate(&body).map_err(|e| FetchError::decode(self.id(), e))?;
        usable_rate(self.id(), rate)
    }
}
