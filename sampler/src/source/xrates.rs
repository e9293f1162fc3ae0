//! USD→EUR scraped from the x-rates.com currency calculator.
//!
//! The page renders the result as
//!
//! ```text
//! <span class="ccOutputRslt">0.9425<span class="ccOutputTrail">86</span><span class="ccOutputCode"> EUR</span></span>
//! ```
//!
//! and the rate is the leading text joined with the trailing digits.

use super::{get_body, usable_rate, RateSource, SourceId};
use crate::error::FetchError;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;

const XRATES_URL: &str = "https://www.x-rates.com/calculator/?from=USD&to=EUR&amount=1";

static RESULT_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<span[^>]*\bclass="[^"]*\bccOutputRslt\b[^"]*"[^>]*>([^<]*)(?:<span[^>]*\bclass="[^"]*\bccOutputTrail\b[^"]*"[^>]*>([^<]*)</span>)?"#,
    )
    .expect("Invalid regex")
});

#[derive(Debug, Clone)]
pub struct XRatesSource {
    client: Client,
    url: String,
}

impl XRatesSource {
    pub fn new(client: Client) -> Self {
        Self::with_url(client, XRATES_URL)
    }

    pub fn with_url(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

/// Extract the rate from the first result span that carries any digits.
fn parse_rate(html: &str) -> Result<f64, String> {
    let rate_str = RESULT_SPAN
        .captures_iter(html)
        .find_map(|cap| {
            let main = cap.get(1).map_or("", |m| m.as_str().trim());
            let trail = cap.get(2).map_or("", |m| m.as_str().trim());
            if main.is_empty() && trail.is_empty() {
                None
            } else {
                Some(format!("{main}{trail}"))
            }
        })
        .ok_or_else(|| "x-rates: USD to EUR rate not found".to_string())?;

    rate_str
        .replace(',', "")
        .parse::<f64>()
        .map_err(|e| format!("x-rates: cannot parse {rate_str:?}: {e}"))
}

#[async_trait]
impl RateSource for XRatesSource {
    fn id(&self) -> SourceId {
        SourceId::Fiat
    }

    fn name(&self) -> &str {
        "x-rates"
    }

    async fn fetch(&self, timeout: Duration) -> Result<f64, FetchError> {
        let body = get_body(&self.client, self.id(), &self.url, "text/html", timeout).await?;
        let html = String::from_utf8_lossy(&body);
        let rate = parse_rate(&html).map_err(|e| FetchError::decode(self.id(), e))?;
        usable_rate(self.id(), rate)
    }
}
