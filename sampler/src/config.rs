//! Sampler cadence and series retention settings.

use derive_builder::Builder;
use std::time::Duration;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60 * 60);
/// Longest supported tick interval.
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// When the first tick fires after the sampler starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FirstTick {
    /// Fetch right away, then every interval.
    #[default]
    Immediate,
    /// Wait one full interval before the first fetch.
    AfterInterval,
}

/// Which samples the store keeps after each append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retention {
    /// Keep samples no older than this, measured from the newest sample.
    Window(Duration),
    /// Keep only the most recent N samples.
    Count(usize),
}

impl Default for Retention {
    fn default() -> Self {
        Retention::Window(DEFAULT_WINDOW)
    }
}

impl Retention {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Retention::Window(w) if w.is_zero() => Err("retention window must be non-zero".into()),
            Retention::Count(0) => Err("retention count must be at least 1".into()),
            _ => Ok(()),
        }
    }
}

#[derive(Builder, Clone, Debug, PartialEq, Eq)]
#[builder(pattern = "owned", build_fn(validate = "Self::validate"))]
pub struct SamplerConfig {
    /// Time between ticks
    #[builder(default = "DEFAULT_INTERVAL")]
    pub interval: Duration,
    /// Bound on each provider call
    #[builder(default = "DEFAULT_FETCH_TIMEOUT")]
    pub fetch_timeout: Duration,
    /// Whether the first tick fires at startup
    #[builder(default)]
    pub first_tick: FirstTick,
}

impl SamplerConfig {
    pub fn builder() -> SamplerConfigBuilder {
        SamplerConfigBuilder::default()
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            first_tick: FirstTick::Immediate,
        }
    }
}

impl SamplerConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if matches!(self.interval, Some(i) if i.is_zero()) {
            return Err("interval must be non-zero".into());
        }
        if matches!(self.interval, Some(i) if i > MAX_INTERVAL) {
            return Err(format!("interval must not exceed {:?}", MAX_INTERVAL));
        }
        if matches!(self.fetch_timeout, Some(t) if t.is_zero()) {
            return Err("fetch timeout must be non-zero".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default() {
        let built = SamplerConfig::builder().build().unwrap();
        assert_eq!(built, SamplerConfig::default());
        assert_eq!(built.interval, Duration::from_secs(10));
    }

    #[test]
    fn builder_rejects_zero_durations() {
        assert!(SamplerConfig::builder()
            .interval(Duration::ZERO)
            .build()
            .is_err());
        assert!(SamplerConfig::builder()
            .fetch_timeout(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn builder_rejects_oversized_interval() {
        assert!(SamplerConfig::builder()
            .interval(MAX_INTERVAL)
            .build()
            .is_ok());
        assert!(SamplerConfig::builder()
            .interval(Duration::from_secs(u64::MAX))
            .build()
            .is_err());
    }

    #[test]
    fn retention_validation() {
        assert!(Retention::default().validate().is_ok());
        assert!(Retention::Count(20).validate().is_ok());
        assert!(Retention::Count(0).validate().is_err());
        assert!(Retention::Window(Duration::ZERO).validate().is_err());
    }
}
