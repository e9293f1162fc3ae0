//! Bounded, lock-guarded series of rate samples.

use crate::config::Retention;
use crate::source::SourceId;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// One observation of both rates, taken in a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub fiat_rate: f64,
    pub crypto_rate: f64,
}

/// Health of the most recent tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Healthy,
    FetchFailed(SourceId),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Healthy => f.write_str("Healthy"),
            Status::FetchFailed(source) => write!(f, "Error fetching {}", source.label()),
        }
    }
}

/// Owned copy of the series taken under the lock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesSnapshot {
    pub samples: Vec<Sample>,
    pub status: Status,
}

impl SeriesSnapshot {
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }
}

#[derive(Debug, Default)]
struct SeriesState {
    // Ascending by timestamp.
    samples: VecDeque<Sample>,
    status: Status,
}

/// Shared handle to the sampled series.
///
/// Cloning is cheap and every clone sees the same series. All operations take
/// one exclusive lock for a short, allocation-only critical section.
#[derive(Debug, Clone)]
pub struct SampleStore {
    inner: Arc<Mutex<SeriesState>>,
    retention: Retention,
}

impl SampleStore {
    pub fn new(retention: Retention) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SeriesState::default())),
            retention,
        }
    }

    /// Append at the tail, then apply retention.
    ///
    /// Returns `false` and keeps the series unchanged when `sample` is older
    /// than the current tail.
    pub fn append(&self, sample: Sample) -> bool {
        let mut state = self.lock();
        self.append_locked(&mut state, sample)
    }

    /// Append and mark the series healthy in one critical section.
    pub fn record(&self, sample: Sample) -> bool {
        let mut state = self.lock();
        let kept = self.append_locked(&mut state, sample);
        state.status = Status::Healthy;
        kept
    }

    pub fn set_status(&self, status: Status) {
        self.lock().status = status;
    }

    pub fn snapshot(&self) -> SeriesSnapshot {
        let state = self.lock();
        SeriesSnapshot {
            samples: state.samples.iter().copied().collect(),
            status: state.status,
        }
    }

    pub fn status(&self) -> Status {
        self.lock().status
    }

    pub fn latest(&self) -> Option<Sample> {
        self.lock().samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().samples.is_empty()
    }

    fn append_locked(&self, state: &mut SeriesState, sample: Sample) -> bool {
        if let Some(tail) = state.samples.back() {
            if sample.timestamp < tail.timestamp {
                warn!(
                    "dropping sample at {} older than tail at {}",
                    sample.timestamp, tail.timestamp
                );
                return false;
            }
        }
        state.samples.push_back(sample);

        let before = state.samples.len();
        match self.retention {
            Retention::Window(window) => {
                let cutoff = TimeDelta::from_std(window)
                    .ok()
                    .and_then(|w| sample.timestamp.checked_sub_signed(w));
                if let Some(cutoff) = cutoff {
                    while state
                        .samples
                        .front()
                        .is_some_and(|s| s.timestamp < cutoff)
                    {
                        state.samples.pop_front();
                    }
                }
            }
            Retention::Count(max) => {
                while state.samples.len() > max {
                    state.samples.pop_front();
                }
            }
        }

        let evicted = before - state.samples.len();
        if evicted > 0 {
            debug!(evicted, retained = state.samples.len(), "applied retention");
        }
        true
    }

    // Every critical section leaves the state consistent, so a poisoned lock
    // still guards valid data.
    fn lock(&self) -> MutexGuard<'_, SeriesState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new(Retention::default())
    }
}
