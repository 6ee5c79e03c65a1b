//! # Response Classifier
//!
//! Turns a [`RawResponse`] into "not found", a payload, or a
//! [`DopplerError::Remote`].

use crate::client::RawResponse;
use crate::error::{DopplerError, Result};
use serde_json::Value;

/// Which statuses a caller is willing to read as "the resource does not exist"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundPolicy {
    /// Every non-200 status is a failure
    Reject,
    /// 404 means missing
    Missing,
    /// 400 or 404 means missing.
    ///
    /// Doppler answers 400 rather than 404 when a lookup references an
    /// unknown project, environment, config or secret. Resource kinds opt in
    /// explicitly; it is never a default since it hides malformed requests.
    MissingOrBadRequest,
}

impl NotFoundPolicy {
    #[must_use]
    pub fn is_not_found(self, status: u16) -> bool {
        match self {
            Self::Reject => false,
            Self::Missing => status == 404,
            Self::MissingOrBadRequest => status == 404 || status == 400,
        }
    }
}

/// Outcome of a successful classification
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    NotFound,
    Found(Value),
}

/// Classify a response.
///
/// A 200 whose `value.raw` is explicitly `null` is a tombstoned secret and
/// reads as [`Classified::NotFound`]. Found object payloads are annotated with
/// `request` and `status_code`.
///
/// # Errors
/// [`DopplerError::Remote`] for any other status.
pub fn classify(response: RawResponse, policy: NotFoundPolicy) -> Result<Classified> {
    let RawResponse {
        status,
        body,
        request,
    } = response;

    if policy.is_not_found(status) {
        tracing::debug!("{} answered {}, treating as not found", request, status);
        return Ok(Classified::NotFound);
    }

    if status != 200 {
        return Err(DopplerError::remote(status, body, request));
    }

    if is_tombstoned(&body) {
        tracing::debug!("{} returned a secret with a null raw value", request);
        return Ok(Classified::NotFound);
    }

    let mut payload = body;
    if let Value::Object(map) = &mut payload {
        let echo = serde_json::to_value(&request).unwrap_or(Value::Null);
        map.insert("request".to_string(), echo);
        map.insert("status_code".to_string(), Value::from(status));
    }
    Ok(Classified::Found(payload))
}

fn is_tombstoned(body: &Value) -> bool {
    body.get("value")
        .and_then(Value::as_object)
        .and_then(|value| value.get("raw"))
        .is_some_and(Value::is_null)
}
