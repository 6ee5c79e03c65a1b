//! # Secret Lookup
//!
//! Read-only access to one field of one secret, by default the decoded
//! (`computed`) value. A failed lookup is an error, never a default value.

use crate::classifier::{classify, Classified, NotFoundPolicy};
use crate::client::DopplerClient;
use crate::error::{DopplerError, Result};
use crate::resources::secret::SECRET_PATH;
use crate::resources::SecretRef;
use serde_json::Value;
use tracing::debug;

/// Fetch `secret` once and return the field at `field_path` (dot separated).
///
/// # Errors
/// [`DopplerError::Lookup`] for any non-200 status, a secret with a null raw
/// value, or a missing field; transport failures as they occurred.
pub async fn lookup(client: &DopplerClient, secret: &SecretRef, field_path: &str) -> Result<Value> {
    let response = client.get(SECRET_PATH, &secret.query()).await?;
    debug!("Lookup of {} answered {}", secret, response.status);

    let payload = match classify(response, NotFoundPolicy::Reject) {
        Ok(Classified::Found(payload)) => payload,
        Ok(Classified::NotFound) => {
            return Err(DopplerError::Lookup {
                descriptor: secret.to_string(),
                status: Some(200),
                detail: "secret has no value".to_string(),
            })
        }
        Err(DopplerError::Remote(remote)) => {
            return Err(DopplerError::Lookup {
                descriptor: secret.to_string(),
                status: Some(remote.status),
                detail: format!("{} {}", remote.status, remote.body),
            })
        }
        Err(e) => return Err(e),
    };

    extract(&payload, field_path)
        .cloned()
        .ok_or_else(|| DopplerError::Lookup {
            descriptor: secret.to_string(),
            status: Some(200),
            detail: format!("field '{field_path}' not present in response"),
        })
}

/// Render a looked-up value for printing: strings bare, everything else as JSON
#[must_use]
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn extract<'a>(payload: &'a Value, field_path: &str) -> Option<&'a Value> {
    field_path
        .split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(payload, |node, segment| node.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_nested_field() {
        let payload = json!({"name": "API_KEY", "value": {"raw": "${X}", "computed": "abc"}});
        assert_eq!(extract(&payload, "value.computed"), Some(&json!("abc")));
        assert_eq!(extract(&payload, "value.raw"), Some(&json!("${X}")));
        assert_eq!(extract(&payload, "name"), Some(&json!("API_KEY")));
        assert_eq!(extract(&payload, "value.missing"), None);
    }

    #[test]
    fn test_render() {
        assert_eq!(render(&json!("abc")), "abc");
        assert_eq!(render(&json!(42)), "42");
        assert_eq!(render(&json!(null)), "null");
    }
}
