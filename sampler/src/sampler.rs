//! Fixed-interval fetch loop feeding the sample store.

use crate::config::{FirstTick, SamplerConfig, MAX_INTERVAL};
use crate::error::{FetchError, FetchErrorKind};
use crate::source::{RateSource, SourceId};
use crate::store::{Sample, SampleStore, Status};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Both rates fetched and a sample was appended.
    Recorded(Sample),
    /// Both rates fetched but the sample was older than the newest stored
    /// one (wall clock stepped back), so the series is unchanged.
    Dropped(Sample),
    /// At least one fetch failed; nothing was appended.
    Failed(FetchError),
}

/// Periodically fetches both rates and appends them to the store.
///
/// The sampler is the only writer of its store. Network calls run with no
/// lock held; only the final append or status update touches the store.
pub struct Sampler {
    fiat: Arc<dyn RateSource>,
    crypto: Arc<dyn RateSource>,
    store: SampleStore,
    config: SamplerConfig,
}

impl Sampler {
    pub fn new(
        fiat: Arc<dyn RateSource>,
        crypto: Arc<dyn RateSource>,
        store: SampleStore,
        config: SamplerConfig,
    ) -> Self {
        Self {
            fiat,
            crypto,
            store,
            config,
        }
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Run one tick stamped with the current time.
    pub async fn tick(&self) -> TickOutcome {
        self.tick_at(Utc::now()).await
    }

    /// Run one tick stamped with `time`.
    ///
    /// Both providers are queried concurrently and both are awaited before
    /// the store is touched, so a sample is never built from a single rate.
    pub async fn tick_at(&self, time: DateTime<Utc>) -> TickOutcome {
        let bound = self.config.fetch_timeout;
        let (fiat, crypto) = tokio::join!(
            fetch_bounded(self.fiat.as_ref(), SourceId::Fiat, bound),
            fetch_bounded(self.crypto.as_ref(), SourceId::Crypto, bound),
        );

        match (fiat, crypto) {
            (Ok(fiat_rate), Ok(crypto_rate)) => {
                let sample = Sample {
                    timestamp: time,
                    fiat_rate,
                    crypto_rate,
                };
                // Both providers answered, so the status goes back to healthy
                // even when the sample itself is out of order.
                if !self.store.record(sample) {
                    warn!(
                        "Discarded {}: {:.6}, {}: {:.4} at {}, clock is behind the newest sample",
                        SourceId::Fiat,
                        fiat_rate,
                        SourceId::Crypto,
                        crypto_rate,
                        time.to_rfc3339()
                    );
                    return TickOutcome::Dropped(sample);
                }
                info!(
                    "Fetched {}: {:.6}, {}: {:.4} at {}",
                    SourceId::Fiat,
                    fiat_rate,
                    SourceId::Crypto,
                    crypto_rate,
                    time.to_rfc3339()
                );
                TickOutcome::Recorded(sample)
            }
            (Err(err), other) => {
                if let Err(other) = other {
                    warn!(provider = self.crypto.name(), "Error fetching {}", other);
                }
                self.fail(SourceId::Fiat, self.fiat.name(), err)
            }
            (Ok(_), Err(err)) => self.fail(SourceId::Crypto, self.crypto.name(), err),
        }
    }

    fn fail(&self, slot: SourceId, provider: &str, err: FetchError) -> TickOutcome {
        warn!(provider, "Error fetching {}", err);
        self.store.set_status(Status::FetchFailed(slot));
        TickOutcome::Failed(err)
    }

    /// Tick on the configured cadence until `cancel` fires.
    ///
    /// Intervals longer than [`MAX_INTERVAL`] are clamped to it.
    ///
    /// A tick in progress when cancellation arrives runs to completion. Ticks
    /// that overrun the interval delay the next one rather than bunching up.
    pub async fn run(self, cancel: CancellationToken) {
        let period = self.config.interval.min(MAX_INTERVAL);
        let now = Instant::now();
        let start = match self.config.first_tick {
            FirstTick::Immediate => now,
            FirstTick::AfterInterval => now.checked_add(period).unwrap_or(now),
        };
        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            fiat = self.fiat.name(),
            crypto = self.crypto.name(),
            "sampler started, interval {:?}",
            period
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.tick().await;
        }

        info!("sampler stopped");
    }
}

async fn fetch_bounded(
    source: &dyn RateSource,
    slot: SourceId,
    bound: Duration,
) -> Result<f64, FetchError> {
    match tokio::time::timeout(bound, source.fetch(bound)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::new(slot, FetchErrorKind::Timeout(bound))),
    }
}
