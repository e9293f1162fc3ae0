//! Read-side view of the series for HTTP handlers.

use crate::store::{SampleStore, SeriesSnapshot};
use chrono::SecondsFormat;
use serde::Serialize;

/// Decimal places used for the current fiat rate.
pub const FIAT_DECIMALS: usize = 6;
/// Decimal places used for the current crypto price.
pub const CRYPTO_DECIMALS: usize = 4;

/// Chart-ready view of the series.
///
/// The three series are index-aligned: entry `i` of each describes the same
/// sample. Serializes to the `/data` JSON shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RateView {
    #[serde(rename = "times")]
    pub timestamps: Vec<String>,
    #[serde(rename = "usdToEur")]
    pub fiat_series: Vec<f64>,
    #[serde(rename = "btcToUsd")]
    pub crypto_series: Vec<f64>,
    /// Latest fiat rate, or empty when there are no samples.
    #[serde(rename = "currentUSDtoEUR")]
    pub current_fiat: String,
    /// Latest crypto price, or empty when there are no samples.
    #[serde(rename = "currentBTCtoUSD")]
    pub current_crypto: String,
    pub status: String,
}

impl From<&SeriesSnapshot> for RateView {
    fn from(snap: &SeriesSnapshot) -> Self {
        let len = snap.samples.len();
        let mut view = RateView {
            timestamps: Vec::with_capacity(len),
            fiat_series: Vec::with_capacity(len),
            crypto_series: Vec::with_capacity(len),
            current_fiat: String::new(),
            current_crypto: String::new(),
            status: snap.status.to_string(),
        };

        for sample in &snap.samples {
            view.timestamps
                .push(sample.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true));
            view.fiat_series.push(sample.fiat_rate);
            view.crypto_series.push(sample.crypto_rate);
        }

        if let Some(last) = snap.latest() {
            view.current_fiat = format!("{:.*}", FIAT_DECIMALS, last.fiat_rate);
            view.current_crypto = format!("{:.*}", CRYPTO_DECIMALS, last.crypto_rate);
        }

        view
    }
}

/// Read-only access to the store for request handlers.
#[derive(Debug, Clone)]
pub struct QueryService {
    store: SampleStore,
}

impl QueryService {
    pub fn new(store: SampleStore) -> Self {
        Self { store }
    }

    /// Build a view from a fresh snapshot. The lock is released before any
    /// formatting happens.
    pub fn current_view(&self) -> RateView {
        let snap = self.store.snapshot();
        RateView::from(&snap)
    }
}
