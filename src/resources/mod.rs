//! # Resource Kinds
//!
//! One module per Doppler resource kind. Each exposes a descriptor type
//! (the key fields), a desired-state type where the kind has one, and an
//! operations struct implementing [`crate::reconciler::ResourceOps`].
//!
//! | kind        | list | update | delete |
//! |-------------|------|--------|--------|
//! | project     | yes  | yes    | yes    |
//! | environment | yes  | no     | yes    |
//! | config      | yes  | no     | yes    |
//! | secret      | no   | yes    | yes    |
//! | integration | yes  | no     | no     |

use crate::classifier::{classify, Classified, NotFoundPolicy};
use crate::client::DopplerClient;
use crate::error::Result;
use crate::reconciler::Observed;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

pub mod config;
pub mod environment;
pub mod integration;
pub mod project;
pub mod secret;

pub use config::{ConfigRef, Configs};
pub use environment::{EnvironmentRef, Environments};
pub use integration::{IntegrationRef, IntegrationSpec, Integrations};
pub use project::{ProjectRef, ProjectSpec, Projects};
pub use secret::{SecretRef, SecretSpec, Secrets};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Project,
    Environment,
    Config,
    Secret,
    Integration,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Environment => "environment",
            Self::Config => "config",
            Self::Secret => "secret",
            Self::Integration => "integration",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GET a single resource, reading `policy` statuses as "missing"
pub(crate) async fn fetch_one(
    client: &DopplerClient,
    path: &str,
    query: &[(&str, &str)],
    policy: NotFoundPolicy,
) -> Result<Observed> {
    let response = client.get(path, query).await?;
    classify(response, policy).map(Observed::from)
}

/// GET a collection. Listing never reads anything as "missing".
pub(crate) async fn fetch_all(
    client: &DopplerClient,
    path: &str,
    query: &[(&str, &str)],
) -> Result<Value> {
    let response = client.get(path, query).await?;
    Ok(payload_or_null(classify(response, NotFoundPolicy::Reject)?))
}

/// Classify the response of a mutating call, which must be a 200
pub(crate) fn mutation_payload(response: crate::client::RawResponse) -> Result<Value> {
    Ok(payload_or_null(classify(response, NotFoundPolicy::Reject)?))
}

fn payload_or_null(classified: Classified) -> Value {
    match classified {
        Classified::Found(payload) => payload,
        Classified::NotFound => Value::Null,
    }
}

static CAMEL_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-z])([A-Z])").expect("static regex is valid - this should never happen")
});

static SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-zA-Z0-9]").expect("static regex is valid - this should never happen")
});

/// Normalise a display name into Doppler's slug form.
///
/// `"Staging"` -> `"staging"`, `"myEnv"` -> `"my_env"`, `"QA Team"` -> `"qa_team"`.
/// Every separator becomes one underscore; leading and trailing separators
/// are dropped.
///
/// Digits are kept (`"stg2"` -> `"stg2"`). The Ansible modules stripped them,
/// which sent `stg2` to the `stg` config.
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    let spaced = CAMEL_BOUNDARY.replace_all(name, "$1 $2");
    let spaced = SEPARATOR.replace_all(&spaced, " ");
    spaced.trim().replace(' ', "_").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case_conversions() {
        let cases = vec![
            ("Staging", "staging"),
            ("myEnv", "my_env"),
            ("QA Team", "qa_team"),
            ("dev-personal", "dev_personal"),
            ("  prd  ", "prd"),
            ("stg2", "stg2"),
            ("already_snake", "already_snake"),
        ];
        for (input, expected) in cases {
            assert_eq!(to_snake_case(input), expected, "input: {input:?}");
        }
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ResourceKind::Config.to_string(), "config");
        assert_eq!(
            serde_json::to_value(ResourceKind::Integration).unwrap(),
            serde_json::json!("integration")
        );
    }
}
