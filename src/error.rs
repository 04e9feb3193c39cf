//! Error types for link intake
//!
//! Rejections are plain values: the validator, codec and classifier return
//! them, and the intake coordinator is the only place that turns one into a
//! user-facing message.

use serde::Serialize;
use thiserror::Error;

/// Why an incoming link was not acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    #[error("link could not be parsed")]
    Malformed,

    #[error("link scheme is not supported")]
    UnsupportedScheme,

    #[error("link host is not a known music service")]
    UntrustedHost,

    #[error("link is percent-encoded too many times")]
    EncodingTooDeep,

    #[error("share token could not be decoded")]
    DecodeFailure,

    #[error("share link is nested too deeply")]
    RecursionLimitExceeded,

    #[error("link resolution service unavailable")]
    ResolutionUnavailable,
}

impl RejectionReason {
    /// Stable machine-readable code, used in API responses and logs.
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::Malformed => "malformed",
            RejectionReason::UnsupportedScheme => "unsupported_scheme",
            RejectionReason::UntrustedHost => "untrusted_host",
            RejectionReason::EncodingTooDeep => "encoding_too_deep",
            RejectionReason::DecodeFailure => "decode_failure",
            RejectionReason::RecursionLimitExceeded => "recursion_limit_exceeded",
            RejectionReason::ResolutionUnavailable => "resolution_unavailable",
        }
    }

    /// Message shown to the user when a delivery is rejected.
    pub fn user_message(&self) -> &'static str {
        match self {
            RejectionReason::Malformed => "That doesn't look like a valid music link.",
            RejectionReason::UnsupportedScheme => "Only web and app music links can be opened.",
            RejectionReason::UntrustedHost => "Links from this site aren't supported.",
            RejectionReason::EncodingTooDeep => "This link is encoded in an unsupported way.",
            RejectionReason::DecodeFailure => "This share link is broken or incomplete.",
            RejectionReason::RecursionLimitExceeded => "This share link wraps too many other links.",
            RejectionReason::ResolutionUnavailable => {
                "Couldn't find this song on other platforms right now. Please try again."
            }
        }
    }

    /// Only a failed resolver call is worth retrying with the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RejectionReason::ResolutionUnavailable)
    }
}

/// Errors from the Link Resolution API client.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("resolver returned status {0}")]
    Status(u16),

    #[error("no matches found for this link")]
    NotFound,

    #[error("invalid resolver response: {0}")]
    InvalidResponse(String),
}

/// Errors raised while reading configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("unknown platform id {0:?}")]
    UnknownPlatform(String),

    #[error("APP_SCHEME {0:?} collides with a web scheme")]
    InvalidScheme(String),
}
