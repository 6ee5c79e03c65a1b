//! Doppler REST client
//!
//! Thin wrapper over `reqwest` that issues exactly one request per call and
//! hands back the status, the decoded body and an echo of what was sent.
//! Interpreting the status is left to [`crate::classifier`].
//!
//! References:
//! - [Doppler API reference](https://docs.doppler.com/reference/api)

use crate::config::ConnectionSettings;
use crate::constants::USER_AGENT;
use crate::error::{DopplerError, Result};
use crate::observability::metrics;
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;
use zeroize::Zeroizing;

/// What was sent, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestEcho {
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl fmt::Display for RequestEcho {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)?;
        if let Some(body) = &self.body {
            write!(f, " {body}")?;
        }
        Ok(())
    }
}

/// Unclassified response
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
    pub request: RequestEcho,
}

/// Doppler REST client
#[derive(Clone)]
pub struct DopplerClient {
    http_client: Client,
    base_url: String,
    token: Zeroizing<String>,
    timeout: Duration,
}

impl fmt::Debug for DopplerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DopplerClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DopplerClient {
    /// Build a client from resolved connection settings
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built
    pub fn new(settings: &ConnectionSettings) -> Result<Self> {
        if !settings.validate_certs() {
            debug!("TLS certificate validation disabled for {}", settings.url());
        }

        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout())
            .danger_accept_invalid_certs(!settings.validate_certs())
            .build()?;

        Ok(Self {
            http_client,
            base_url: settings.url().trim_end_matches('/').to_string(),
            token: Zeroizing::new(settings.token().to_string()),
            timeout: settings.timeout(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<RawResponse> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<RawResponse> {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    pub async fn delete(&self, path: &str, body: Value) -> Result<RawResponse> {
        self.request(Method::DELETE, path, &[], Some(body)).await
    }

    /// Issue a single request.
    ///
    /// Never retried. A request that outlives the configured timeout fails
    /// with [`DopplerError::Timeout`]; any other transport failure with
    /// [`DopplerError::Transport`].
    ///
    /// # Errors
    /// Transport failures only; HTTP error statuses are returned as responses.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, path);

        let mut builder = self
            .http_client
            .request(method.clone(), &url)
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {}", self.token.as_str()));
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = &body {
            // Sets Content-Type: application/json
            builder = builder.json(body);
        }

        let request = match builder.build() {
            Ok(request) => request,
            Err(e) => {
                return Err(DopplerError::Transport {
                    request: RequestEcho {
                        method: method.to_string(),
                        url,
                        body,
                    },
                    source: e,
                })
            }
        };
        let echo = RequestEcho {
            method: method.to_string(),
            url: request.url().to_string(),
            body,
        };
        debug!("Doppler request: {}", echo);

        let start = Instant::now();
        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                metrics::record_request(method.as_str(), "timeout", start.elapsed());
                return Err(DopplerError::Timeout {
                    timeout: self.timeout,
                    request: echo,
                });
            }
            Err(e) => {
                metrics::record_request(method.as_str(), "error", start.elapsed());
                return Err(DopplerError::Transport {
                    request: echo,
                    source: e,
                });
            }
        };

        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) if e.is_timeout() => {
                metrics::record_request(method.as_str(), "timeout", start.elapsed());
                return Err(DopplerError::Timeout {
                    timeout: self.timeout,
                    request: echo,
                });
            }
            Err(e) => {
                return Err(DopplerError::Transport {
                    request: echo,
                    source: e,
                });
            }
        };
        metrics::record_request(method.as_str(), &status.to_string(), start.elapsed());
        debug!("Doppler response: {} {} in {:?}", status, echo.url, start.elapsed());

        Ok(RawResponse {
            status,
            body: decode_body(&text),
            request: echo,
        })
    }
}

/// Empty bodies become `null`; bodies that are not JSON are kept as a string
fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_body_variants() {
        assert_eq!(decode_body(""), Value::Null);
        assert_eq!(decode_body("  \n"), Value::Null);
        assert_eq!(decode_body(r#"{"success":true}"#), json!({"success": true}));
        assert_eq!(
            decode_body("<html>Bad Gateway</html>"),
            Value::String("<html>Bad Gateway</html>".to_string())
        );
    }

    #[test]
    fn test_request_echo_display() {
        let echo = RequestEcho {
            method: "DELETE".to_string(),
            url: "https://api.doppler.com/v3/projects/project".to_string(),
            body: Some(json!({"project": "demo"})),
        };
        assert_eq!(
            echo.to_string(),
            r#"DELETE https://api.doppler.com/v3/projects/project {"project":"demo"}"#
        );
    }

    #[tokio::test]
    async fn test_unanswered_request_times_out() {
        // Accepts connections and holds them open without ever answering
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let settings = ConnectionSettings::new(format!("http://{addr}"), "t")
            .with_timeout(Duration::from_secs(1));
        let client = DopplerClient::new(&settings).unwrap();
        let err = client
            .get("/projects/project", &[("project", "p")])
            .await
            .unwrap_err();
        server.abort();

        match err {
            DopplerError::Timeout { timeout, request } => {
                assert_eq!(timeout, Duration::from_secs(1));
                assert_eq!(request.method, "GET");
                assert_eq!(request.url, format!("http://{addr}/projects/project?project=p"));
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let settings = ConnectionSettings::new(format!("http://{addr}"), "t");
        let client = DopplerClient::new(&settings).unwrap();
        let err = client
            .post("/projects", json!({"name": "demo"}))
            .await
            .unwrap_err();

        match err {
            DopplerError::Transport { request, .. } => {
                assert_eq!(request.method, "POST");
                assert_eq!(request.body, Some(json!({"name": "demo"})));
            }
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unbuildable_request_carries_echo() {
        let settings = ConnectionSettings::new("api.doppler.com/v3", "t");
        let client = DopplerClient::new(&settings).unwrap();
        let err = client.get("/projects", &[]).await.unwrap_err();

        assert!(matches!(err, DopplerError::Transport { .. }));
        let request = err.request().expect("failure carries the request");
        assert_eq!(request.url, "api.doppler.com/v3/projects");
    }

    #[test]
    fn test_client_debug_hides_token() {
        let settings = ConnectionSettings::new("https://api.doppler.com/v3/", "dp.st.hidden");
        let client = DopplerClient::new(&settings).unwrap();
        assert_eq!(client.base_url(), "https://api.doppler.com/v3");
        assert!(!format!("{client:?}").contains("dp.st.hidden"));
    }
}
