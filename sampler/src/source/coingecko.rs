use super::{get_body, usable_rate, RateSource, SourceId};
use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

const COINGECKO_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd";

/// CoinGecko spot price for BTC in USD.
#[derive(Debug, Clone)]
pub struct CoinGeckoSource {
    client: Client,
    url: String,
}

impl CoinGeckoSource {
    pub fn new(client: Client) -> Self {
        Self::with_url(client, COINGECKO_URL)
    }

    pub fn with_url(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

/// Parse `{ "bitcoin": { "usd": 12345.6 } }`.
fn parse_rate(body: &[u8]) -> Result<f64, String> {
    let parsed: HashMap<String, HashMap<String, f64>> = serde_json::from_slice(body)
        .map_err(|e| format!("coingecko: parse JSON failed: {e}"))?;
    let rec = parsed
        .get("bitcoin")
        .ok_or_else(|| "coingecko: id missing in response: bitcoin".to_string())?;
    rec.get("usd")
        .copied()
        .ok_or_else(|| "coingecko: usd missing for id: bitcoin".to_string())
}

#[async_trait]
impl RateSource for CoinGeckoSource {
    fn id(&self) -> SourceId {
        SourceId::Crypto
    }

    fn name(&self) -> &str {
        "coingecko"
    }

    async fn fetch(&self, timeout: Duration) -> Result<f64, FetchError> {
        let body = get_body(&self.client, self.id(), &self.url, "application/json", timeout).await?;
        let rate = parse_rate(&body).map_err(|e| FetchError::decode(self.id(), e))?;
        usable_rate(self.id(), rate)
    }
}
