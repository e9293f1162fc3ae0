//! Rate sources: one numeric rate per call from an external provider.
//!
//! Every provider enforces its own timeout and turns transport, status and
//! decode failures into a [`FetchError`] tagged with its [`SourceId`]. There
//! are no retries here; the next scheduled tick is the retry.

pub mod coindesk;
pub mod coingecko;
pub mod er_api;
pub mod xrates;

use crate::error::{FetchError, FetchErrorKind};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use coindesk::CoinDeskSource;
pub use coingecko::CoinGeckoSource;
pub use er_api::ErApiSource;
pub use xrates::XRatesSource;

/// Browser-like UA; the scraped calculator page rejects obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

/// Which of the two sampled rates a source supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    /// USD → EUR exchange rate.
    Fiat,
    /// BTC → USD price.
    Crypto,
}

impl SourceId {
    pub fn label(self) -> &'static str {
        match self {
            SourceId::Fiat => "USD to EUR",
            SourceId::Crypto => "BTC to USD",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fetch one rate from an external provider.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Which rate this source supplies.
    fn id(&self) -> SourceId;

    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Fetch the current rate. Must return within `timeout`.
    async fn fetch(&self, timeout: Duration) -> Result<f64, FetchError>;
}

/// Providers that can supply the fiat rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FiatProvider {
    /// Scrape the x-rates.com calculator page.
    #[default]
    XRates,
    /// open.er-api.com JSON feed.
    OpenErApi,
}

impl FiatProvider {
    pub fn build(self, client: Client) -> Arc<dyn RateSource> {
        match self {
            FiatProvider::XRates => Arc::new(XRatesSource::new(client)),
            FiatProvider::OpenErApi => Arc::new(ErApiSource::new(client)),
        }
    }
}

/// Providers that can supply the crypto price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CryptoProvider {
    /// CoinDesk Bitcoin Price Index.
    #[default]
    CoinDesk,
    /// CoinGecko `/simple/price`.
    CoinGecko,
}

impl CryptoProvider {
    pub fn build(self, client: Client) -> Arc<dyn RateSource> {
        match self {
            CryptoProvider::CoinDesk => Arc::new(CoinDeskSource::new(client)),
            CryptoProvider::CoinGecko => Arc::new(CoinGeckoSource::new(client)),
        }
    }
}

/// Build the HTTP client shared by all providers.
pub fn http_client() -> reqwest::Result<Client> {
    Client::builder().user_agent(USER_AGENT).build()
}

/// GET `url` and return the body of a 2xx response.
///
/// The whole exchange (connect, headers, body) is bounded by `bound`.
pub(crate) async fn get_body(
    client: &Client,
    source: SourceId,
    url: &str,
    accept: &str,
    bound: Duration,
) -> Result<Vec<u8>, FetchError> {
    let request = async {
        let resp = client
            .get(url)
            .header(ACCEPT, accept)
            .timeout(bound)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(source, e, bound))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::new(
                source,
                FetchErrorKind::HttpStatus(status.as_u16()),
            ));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(source, e, bound))?;
        Ok::<_, FetchError>(body.to_vec())
    };

    tokio::time::timeout(bound, request)
        .await
        .map_err(|_| FetchError::new(source, FetchErrorKind::Timeout(bound)))?
}

/// Reject rates that cannot be a real quote.
pub(crate) fn usable_rate(source: SourceId, rate: f64) -> Result<f64, FetchError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(FetchError::decode(source, format!("unusable rate: {rate}")))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn labels() {
        assert_eq!(SourceId::Fiat.to_string(), "USD to EUR");
        assert_eq!(SourceId::Crypto.label(), "BTC to USD");
    }

    #[test]
    fn rejects_unusable_rates() {
        assert!(usable_rate(SourceId::Fiat, 0.94).is_ok());
        assert!(usable_rate(SourceId::Fiat, 0.0).is_err());
        assert!(usable_rate(SourceId::Fiat, -1.0).is_err());
        assert!(usable_rate(SourceId::Crypto, f64::NAN).is_err());
        assert!(usable_rate(SourceId::Crypto, f64::INFINITY).is_err());
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let url = serve_once(http_response("503 Service Unavailable", "text/plain", "down")).await;
        let client = http_client().unwrap();

        let err = get_body(&client, SourceId::Crypto, &url, "*/*", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert_eq!(err.source_id, SourceId::Crypto);
        assert_eq!(err.kind, FetchErrorKind::HttpStatus(503));
    }

    #[tokio::test]
    async fn silent_provider_times_out() {
        let url = serve_silence().await;
        let client = http_client().unwrap();
        let bound = Duration::from_millis(200);

        let err = get_body(&client, SourceId::Fiat, &url, "*/*", bound)
            .await
            .unwrap_err();

        assert_eq!(err.source_id, SourceId::Fiat);
        assert_eq!(err.kind, FetchErrorKind::Timeout(bound));
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = http_client().unwrap();

        let err = get_body(
            &client,
            SourceId::Fiat,
            &format!("http://{addr}"),
            "*/*",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert!(matches!(err.kind, FetchErrorKind::Transport(_)), "{err}");
    }

    #[tokio::test]
    async fn success_returns_body() {
        let url = serve_once(http_response("200 OK", "application/json", "{\"ok\":1}")).await;
        let client = http_client().unwrap();

        let body = get_body(&client, SourceId::Crypto, &url, "application/json", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(body, b"{\"ok\":1}");
    }
}
