//! Server configuration from flags, environment variables and `.env`.

use anyhow::{ensure, Context};
use clap::Parser;
use rate_sampler::{CryptoProvider, FiatProvider, FirstTick, Retention, SamplerConfig};
use std::net::SocketAddr;
use std::time::Duration;

/// Rates dashboard: samples USD→EUR and BTC→USD on a fixed interval and serves
/// the recent series as a chart page and a JSON feed.
#[derive(Parser, Debug, Clone)]
#[command(name = "rate-server", author, version, about, long_about = None)]
pub struct Args {
    /// Address to listen on
    #[arg(short, long, env = "RATES_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Seconds between ticks
    #[arg(long = "interval-secs", env = "RATES_INTERVAL_SECS", default_value = "10")]
    pub interval_secs: u64,

    /// Per-provider request bound in seconds
    #[arg(
        long = "fetch-timeout-secs",
        env = "RATES_FETCH_TIMEOUT_SECS",
        default_value = "8"
    )]
    pub fetch_timeout_secs: u64,

    /// When the first tick fires: immediate | after-interval
    #[arg(
        long = "first-tick",
        env = "RATES_FIRST_TICK",
        value_parser = parse_first_tick,
        default_value = "immediate"
    )]
    pub first_tick: FirstTick,

    /// Keep samples at most this many seconds older than the newest one
    #[arg(
        long = "retention-window-secs",
        env = "RATES_RETENTION_WINDOW_SECS",
        default_value = "3600"
    )]
    pub retention_window_secs: u64,

    /// Keep only the most recent N samples instead of a time window
    #[arg(
        long = "retention-count",
        env = "RATES_RETENTION_COUNT",
        conflicts_with = "retention_window_secs"
    )]
    pub retention_count: Option<usize>,

    /// USD→EUR provider: x-rates | open-er-api
    #[arg(
        long = "fiat-provider",
        env = "RATES_FIAT_PROVIDER",
        value_parser = parse_fiat_provider,
        default_value = "x-rates"
    )]
    pub fiat_provider: FiatProvider,

    /// BTC→USD provider: coindesk | coingecko
    #[arg(
        long = "crypto-provider",
        env = "RATES_CRYPTO_PROVIDER",
        value_parser = parse_crypto_provider,
        default_value = "coindesk"
    )]
    pub crypto_provider: CryptoProvider,

    /// Seconds in-flight requests get to finish after a shutdown signal
    #[arg(
        long = "shutdown-grace-secs",
        env = "RATES_SHUTDOWN_GRACE_SECS",
        default_value = "5"
    )]
    pub shutdown_grace_secs: u64,
}

impl Args {
    pub fn sampler_config(&self) -> anyhow::Result<SamplerConfig> {
        SamplerConfig::builder()
            .interval(Duration::from_secs(self.interval_secs))
            .fetch_timeout(Duration::from_secs(self.fetch_timeout_secs))
            .first_tick(self.first_tick)
            .build()
            .context("invalid sampler configuration")
    }

    pub fn retention(&self) -> anyhow::Result<Retention> {
        let retention = match self.retention_count {
            Some(count) => Retention::Count(count),
            None => Retention::Window(Duration::from_secs(self.retention_window_secs)),
        };
        retention
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid retention")?;
        Ok(retention)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Check everything that can be checked before binding the listener.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.sampler_config()?;
        self.retention()?;
        ensure!(
            self.fetch_timeout_secs <= self.interval_secs,
            "fetch timeout ({}s) must not exceed the tick interval ({}s)",
            self.fetch_timeout_secs,
            self.interval_secs
        );
        Ok(())
    }
}

fn parse_first_tick(s: &str) -> Result<FirstTick, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "immediate" | "now" => Ok(FirstTick::Immediate),
        "after-interval" | "delayed" => Ok(FirstTick::AfterInterval),
        other => Err(format!(
            "invalid first tick '{}'; expected one of: immediate, after-interval",
            other
        )),
    }
}

fn parse_fiat_provider(s: &str) -> Result<FiatProvider, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "x-rates" | "xrates" => Ok(FiatProvider::XRates),
        "open-er-api" | "er-api" => Ok(FiatProvider::OpenErApi),
        other => Err(format!(
            "invalid fiat provider '{}'; expected one of: x-rates, open-er-api",
            other
        )),
    }
}

fn parse_crypto_provider(s: &str) -> Result<CryptoProvider, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "coindesk" => Ok(CryptoProvider::CoinDesk),
        "coingecko" => Ok(CryptoProvider::CoinGecko),
        other => Err(format!(
            "invalid crypto provider '{}'; expected one of: coindesk, coingecko",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("rate-server").chain(args.iter().copied()))
    }

    #[test]
    fn defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.listen, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(args.fiat_provider, FiatProvider::XRates);
        assert_eq!(args.crypto_provider, CryptoProvider::CoinDesk);
        assert_eq!(
            args.retention().unwrap(),
            Retention::Window(Duration::from_secs(3600))
        );

        let config = args.sampler_config().unwrap();
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.fetch_timeout, Duration::from_secs(8));
        assert_eq!(config.first_tick, FirstTick::Immediate);
        assert_eq!(args.shutdown_grace(), Duration::from_secs(5));
        args.validate().unwrap();
    }

    #[test]
    fn count_retention() {
        let args = parse(&["--retention-count", "20"]).unwrap();
        assert_eq!(args.retention().unwrap(), Retention::Count(20));
    }

    #[test]
    fn count_and_window_conflict() {
        assert!(parse(&["--retention-count", "20", "--retention-window-secs", "60"]).is_err());
    }

    #[test]
    fn providers_and_first_tick() {
        let args = parse(&[
            "--fiat-provider",
            "open-er-api",
            "--crypto-provider",
            "CoinGecko",
            "--first-tick",
            "after-interval",
        ])
        .unwrap();
        assert_eq!(args.fiat_provider, FiatProvider::OpenErApi);
        assert_eq!(args.crypto_provider, CryptoProvider::CoinGecko);
        assert_eq!(args.first_tick, FirstTick::AfterInterval);

        assert!(parse(&["--fiat-provider", "ecb"]).is_err());
    }

    #[test]
    fn rejects_degenerate_values() {
        assert!(parse(&["--interval-secs", "0"]).unwrap().validate().is_err());
        assert!(parse(&["--retention-count", "0"]).unwrap().validate().is_err());
        assert!(parse(&["--retention-window-secs", "0"])
            .unwrap()
            .validate()
            .is_err());
        assert!(parse(&[
            "--interval-secs",
            "18446744073709551615",
            "--first-tick",
            "after-interval"
        ])
        .unwrap()
        .validate()
        .is_err());
        assert!(parse(&["--interval-secs", "5", "--fetch-timeout-secs", "8"])
            .unwrap()
            .validate()
            .is_err());
    }
}
