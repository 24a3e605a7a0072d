//! Error types for the cal-sink service.

use thiserror::Error;

/// Error taxonomy for webhook handling and reconciliation.
///
/// `Payload` errors are consumed inside the dispatcher and resolve as no-op
/// successes so new Cal.com fields or event kinds never break delivery.
/// `Store` and `Tracker` errors propagate to the HTTP boundary as a 500 so
/// the webhook sender's own retry mechanism can redeliver.
#[derive(Error, Debug, Clone)]
pub enum SinkError {
    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Malformed payload: {reason}")]
    Payload { reason: String },

    #[error("Mapping store failure: {reason}")]
    Store { reason: String },

    #[error("Task tracker failure: {reason}")]
    Tracker { reason: String },
}

impl SinkError {
    /// Build a `Payload` error.
    pub fn payload(reason: impl Into<String>) -> Self {
        Self::Payload {
            reason: reason.into(),
        }
    }

    /// Build a `Store` error.
    pub fn store(reason: impl Into<String>) -> Self {
        Self::Store {
            reason: reason.into(),
        }
    }

    /// Build a `Tracker` error.
    pub fn tracker(reason: impl Into<String>) -> Self {
        Self::Tracker {
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type SinkResult<T> = Result<T, SinkError>;
