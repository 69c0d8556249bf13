//! Error types for the Quorum SDK
//!
//! Conversion and resolution failures are synchronous; transaction
//! lifecycle failures after broadcast are delivered through the error
//! observer path. Adapter and wallet failures are carried opaquely as
//! [`eyre::Report`]s and never reinterpreted.

use thiserror::Error;

/// One failed conversion attempt during overload resolution.
#[derive(Debug, Clone)]
pub struct OverloadAttempt {
    /// Canonical signature that was tried (e.g. `transfer(address,uint256)`).
    pub signature: String,
    /// The validation failure it produced.
    pub reason: String,
}

fn overload_message(attempts: &[OverloadAttempt]) -> String {
    let mut msg = String::from("Errors creating overloaded function call:");
    for attempt in attempts {
        msg.push_str(&format!(
            "\nFor signature \"{}\": {}",
            attempt.signature, attempt.reason
        ));
    }
    msg
}

/// Errors produced by the SDK.
#[derive(Debug, Error)]
pub enum Error {
    /// A single parameter failed its type's validate check.
    #[error("Validation for field \"{field}\" failed: {reason}")]
    Validation {
        /// Name of the offending parameter.
        field: String,
        /// Type-specific failure reason.
        reason: String,
    },

    /// Every candidate signature of an overloaded function failed to convert.
    #[error("{}", overload_message(.0))]
    Overload(Vec<OverloadAttempt>),

    /// An operation violated the transaction lifecycle invariants.
    #[error("{0}")]
    State(String),

    /// A signature's mode could not be determined, or required signers are
    /// missing at send time.
    #[error("{0}")]
    Signature(String),

    /// Failure propagated from the Adapter or Wallet collaborators.
    #[error(transparent)]
    Transport(#[from] eyre::Report),
}

impl Error {
    /// Shorthand for an [`Error::State`] with an owned message.
    pub fn state(msg: impl Into<String>) -> Self {
        Error::State(msg.into())
    }

    /// Shorthand for an [`Error::Signature`] with an owned message.
    pub fn signature(msg: impl Into<String>) -> Self {
        Error::Signature(msg.into())
    }
}

/// Result alias used throughout the SDK.
pub type Result<T, E = Error> = std::result::Result<T, E>;
