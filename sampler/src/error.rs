//! Fetch failures surfaced by rate sources.

use crate::source::SourceId;
use std::time::Duration;
use thiserror::Error;

/// A failed fetch from one provider, tagged with the source it came from.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{source_id}: {kind}")]
pub struct FetchError {
    pub source_id: SourceId,
    pub kind: FetchErrorKind,
}

/// What went wrong while fetching a rate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchErrorKind {
    /// Connection, TLS or body transfer failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider answered with a non-2xx status.
    #[error("non-success HTTP status: {0}")]
    HttpStatus(u16),

    /// Payload did not have the expected shape or held no usable rate.
    #[error("decode error: {0}")]
    Decode(String),

    /// The call did not complete within its bound.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    pub fn new(source_id: SourceId, kind: FetchErrorKind) -> Self {
        Self { source_id, kind }
    }

    pub fn decode(source: SourceId, msg: impl Into<String>) -> Self {
        Self::new(source, FetchErrorKind::Decode(msg.into()))
    }

    /// Classify a reqwest failure. Status errors are expected to be handled
    /// before the body is read, so anything left here is transport or decode.
    pub(crate) fn from_reqwest(source: SourceId, err: reqwest::Error, bound: Duration) -> Self {
        let kind = if err.is_timeout() {
            FetchErrorKind::Timeout(bound)
        } else if let Some(status) = err.status() {
            FetchErrorKind::HttpStatus(status.as_u16())
        } else if err.is_decode() {
            FetchErrorKind::Decode(err.to_string())
        } else {
            FetchErrorKind::Transport(err.to_string())
        };
        Self::new(source, kind)
    }
}
