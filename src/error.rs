//! # Errors
//!
//! Closed set of failures an invocation can end with. None of them is
//! recovered locally: every variant terminates the invocation and is reported
//! with enough detail (status, body, request) to diagnose it.

use crate::client::RequestEcho;
use crate::resources::ResourceKind;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = DopplerError> = std::result::Result<T, E>;

/// An HTTP response outside the statuses the caller expected
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    pub status: u16,
    pub body: Value,
    pub request: RequestEcho,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unexpected REST failure (HTTP {}): {}, {}",
            self.status, self.body, self.request
        )
    }
}

#[derive(Debug, Error)]
pub enum DopplerError {
    #[error("Unable to set {name} from arguments or environment variable {env_var}")]
    MissingConfig { name: String, env_var: String },

    #[error("Invalid value for {name}: {reason}")]
    InvalidConfig { name: String, reason: String },

    #[error("{0}")]
    Remote(Box<RemoteError>),

    #[error("{kind} {descriptor} doesn't exist and can't be created: {reason}")]
    InsufficientDesiredState {
        kind: ResourceKind,
        descriptor: String,
        reason: String,
    },

    #[error("Request timed out after {}s: {request}", timeout.as_secs())]
    Timeout {
        timeout: Duration,
        request: RequestEcho,
    },

    #[error("Request failed: {request}: {source}")]
    Transport {
        request: RequestEcho,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to lookup secret {descriptor}: {detail}")]
    Lookup {
        descriptor: String,
        status: Option<u16>,
        detail: String,
    },

    #[error("The Doppler API does not support {operation} for {kind} resources")]
    Unsupported {
        kind: ResourceKind,
        operation: &'static str,
    },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl DopplerError {
    pub(crate) fn remote(status: u16, body: Value, request: RequestEcho) -> Self {
        Self::Remote(Box::new(RemoteError {
            status,
            body,
            request,
        }))
    }

    /// The outbound request associated with the failure, if one was issued
    #[must_use]
    pub fn request(&self) -> Option<&RequestEcho> {
        match self {
            Self::Remote(remote) => Some(&remote.request),
            Self::Timeout { request, .. } | Self::Transport { request, .. } => Some(request),
            _ => None,
        }
    }

    /// HTTP status associated with the failure, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote(remote) => Some(remote.status),
            Self::Lookup { status, .. } => *status,
            _ => None,
        }
    }

    /// Response body associated with the failure, if any
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Remote(remote) => Some(&remote.body),
            _ => None,
        }
    }
}
