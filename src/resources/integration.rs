//! Doppler integrations.
//!
//! Create and list only. The API exposes no update or delete for an
//! integration, so `absent` on an existing one fails with
//! [`DopplerError::Unsupported`].

use super::{fetch_all, fetch_one, mutation_payload, ResourceKind};
use crate::classifier::NotFoundPolicy;
use crate::client::DopplerClient;
use crate::error::{DopplerError, Result};
use crate::reconciler::{Observed, ResourceOps};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;

const INTEGRATIONS_PATH: &str = "/integrations";
/// Misspelt on purpose: this is the path the upstream API serves
const INTEGRATION_PATH: &str = "/integrations/integraiton";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationRef {
    name: String,
}

impl IntegrationRef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for IntegrationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Integration type plus any provider-specific fields sent on create
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntegrationSpec {
    pub integration_type: Option<String>,
    pub fields: Map<String, Value>,
}

impl IntegrationSpec {
    /// Parse `KEY=VALUE` pairs into fields; later pairs win
    ///
    /// # Errors
    /// [`DopplerError::InvalidConfig`] for a pair without `=` or with an empty key.
    pub fn from_pairs(integration_type: Option<String>, pairs: &[String]) -> Result<Self> {
        let mut fields = Map::new();
        for pair in pairs {
            match pair.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    fields.insert(key.trim().to_string(), Value::from(value));
                }
                _ => {
                    return Err(DopplerError::InvalidConfig {
                        name: "field".to_string(),
                        reason: format!("expected KEY=VALUE, got '{pair}'"),
                    })
                }
            }
        }
        Ok(Self {
            integration_type,
            fields,
        })
    }

    fn create_body(&self, descriptor: &IntegrationRef) -> Value {
        let mut body = self.fields.clone();
        body.insert("integration".to_string(), Value::from(descriptor.name()));
        if let Some(kind) = &self.integration_type {
            body.insert("type".to_string(), Value::from(kind.as_str()));
        }
        Value::Object(body)
    }
}

#[derive(Debug, Clone)]
pub struct Integrations {
    client: DopplerClient,
}

impl Integrations {
    #[must_use]
    pub fn new(client: DopplerClient) -> Self {
        Self { client }
    }

    /// Every integration in the workplace
    ///
    /// # Errors
    /// Any non-200 response.
    pub async fn list(&self) -> Result<Value> {
        fetch_all(&self.client, INTEGRATIONS_PATH, &[]).await
    }
}

#[async_trait]
impl ResourceOps for Integrations {
    type Descriptor = IntegrationRef;
    type Desired = IntegrationSpec;

    const KIND: ResourceKind = ResourceKind::Integration;

    async fn fetch(&self, descriptor: &IntegrationRef) -> Result<Observed> {
        fetch_one(
            &self.client,
            INTEGRATION_PATH,
            &[("integration", descriptor.name())],
            NotFoundPolicy::MissingOrBadRequest,
        )
        .await
    }

    fn check_creatable(&self, descriptor: &IntegrationRef, desired: &IntegrationSpec) -> Result<()> {
        if desired.integration_type.is_none() {
            return Err(DopplerError::InsufficientDesiredState {
                kind: Self::KIND,
                descriptor: descriptor.to_string(),
                reason: "no integration type given".to_string(),
            });
        }
        Ok(())
    }

    async fn create(&self, descriptor: &IntegrationRef, desired: &IntegrationSpec) -> Result<Value> {
        let body = desired.create_body(descriptor);
        mutation_payload(self.client.post(INTEGRATIONS_PATH, body).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fields_from_pairs() {
        let spec = IntegrationSpec::from_pairs(
            Some("aws_secrets_manager".to_string()),
            &[
                "region=us-east-1".to_string(),
                "role_arn=arn:aws:iam::1:role/x=y".to_string(),
            ],
        )
        .unwrap();
        assert_eq!(spec.fields["region"], "us-east-1");
        assert_eq!(spec.fields["role_arn"], "arn:aws:iam::1:role/x=y");
    }

    #[test]
    fn test_bad_pair_rejected() {
        assert!(matches!(
            IntegrationSpec::from_pairs(None, &["region".to_string()]),
            Err(DopplerError::InvalidConfig { .. })
        ));
        assert!(matches!(
            IntegrationSpec::from_pairs(None, &["=x".to_string()]),
            Err(DopplerError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_create_body_merges_fields() {
        let spec = IntegrationSpec::from_pairs(
            Some("aws_secrets_manager".to_string()),
            &["region=eu-west-1".to_string()],
        )
        .unwrap();
        let body = spec.create_body(&IntegrationRef::new("prod-aws"));
        assert_eq!(
            body,
            json!({
                "integration": "prod-aws",
                "type": "aws_secrets_manager",
                "region": "eu-west-1"
            })
        );
    }
}
