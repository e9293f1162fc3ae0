//! Periodic sampling of a fiat exchange rate and a crypto price into a bounded,
//! in-memory time series.
//!
//! ## Data flow
//!
//! ```text
//! timer tick ─► Sampler ─► RateSource (fiat) ─┐
//!                      └─► RateSource (crypto)┴─► SampleStore::append / set_status
//!
//! HTTP handler ─► QueryService::current_view ─► SampleStore::snapshot
//! ```
//!
//! The [`SampleStore`] is the only shared mutable state. It is locked for short,
//! non-I/O critical sections only; network calls happen before the lock is taken.

pub mod config;
pub mod error;
pub mod query;
pub mod sampler;
pub mod source;
pub mod store;

pub use config::{FirstTick, Retention, SamplerConfig, SamplerConfigBuilder};
pub use error::{FetchError, FetchErrorKind};
pub use query::{QueryService, RateView};
pub use sampler::{Sampler, TickOutcome};
pub use source::{CryptoProvider, FiatProvider, RateSource, SourceId};
pub use store::{Sample, SampleStore, SeriesSnapshot, Status};
