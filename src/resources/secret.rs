//! Doppler secrets.
//!
//! Create, update and delete all go through the config's change-request
//! endpoint. Divergence compares the desired value with the stored `raw`
//! value, which may hold references to other secrets, rather than the
//! `computed` value.

use super::{fetch_one, mutation_payload, ResourceKind};
use crate::classifier::NotFoundPolicy;
use crate::client::DopplerClient;
use crate::constants::VALUE_WITHHELD_NOTE;
use crate::error::{DopplerError, Result};
use crate::reconciler::{Observed, ResourceOps};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use tracing::warn;

pub(crate) const SECRET_PATH: &str = "/configs/config/secret";
const SECRETS_PATH: &str = "/configs/config/secrets";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef {
    project: String,
    config: String,
    name: String,
}

impl SecretRef {
    #[must_use]
    pub fn new(
        project: impl Into<String>,
        config: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            config: config.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    #[must_use]
    pub fn config(&self) -> &str {
        &self.config
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn query(&self) -> [(&str, &str); 3] {
        [
            ("name", self.name()),
            ("project", self.project()),
            ("config", self.config()),
        ]
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.config, self.name)
    }
}

/// Desired secret value. `None` means "only check that it exists".
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SecretSpec {
    value: Option<String>,
}

impl fmt::Debug for SecretSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretSpec")
            .field("value", &self.value.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SecretSpec {
    /// An empty value is treated as no value at all
    #[must_use]
    pub fn new(value: Option<String>) -> Self {
        Self {
            value: value.filter(|v| !v.is_empty()),
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Strip the secret value from a reported payload
pub fn withhold_value(payload: &mut Value) {
    if let Value::Object(map) = payload {
        map.remove("value");
        map.insert("note".to_string(), Value::from(VALUE_WITHHELD_NOTE));
    }
}

#[derive(Debug, Clone)]
pub struct Secrets {
    client: DopplerClient,
}

impl Secrets {
    #[must_use]
    pub fn new(client: DopplerClient) -> Self {
        Self { client }
    }

    async fn submit(&self, descriptor: &SecretRef, change: Value) -> Result<Value> {
        let body = json!({
            "project": descriptor.project(),
            "config": descriptor.config(),
            "change_requests": [change],
        });
        mutation_payload(self.client.post(SECRETS_PATH, body).await?)
    }

    /// Write the value, then read the secret back so the result is what Doppler stored
    async fn write(&self, descriptor: &SecretRef, desired: &SecretSpec) -> Result<Value> {
        let written = self
            .submit(
                descriptor,
                json!({
                    "name": descriptor.name(),
                    "originalName": descriptor.name(),
                    "value": desired.value(),
                }),
            )
            .await?;

        match self.fetch(descriptor).await? {
            Observed::Present(secret) => Ok(secret),
            Observed::Missing => {
                warn!("Secret {} not readable after write", descriptor);
                Ok(written)
            }
        }
    }
}

#[async_trait]
impl ResourceOps for Secrets {
    type Descriptor = SecretRef;
    type Desired = SecretSpec;

    const KIND: ResourceKind = ResourceKind::Secret;

    async fn fetch(&self, descriptor: &SecretRef) -> Result<Observed> {
        fetch_one(
            &self.client,
            SECRET_PATH,
            &descriptor.query(),
            NotFoundPolicy::MissingOrBadRequest,
        )
        .await
    }

    fn check_creatable(&self, descriptor: &SecretRef, desired: &SecretSpec) -> Result<()> {
        if desired.value().is_none() {
            return Err(DopplerError::InsufficientDesiredState {
                kind: Self::KIND,
                descriptor: descriptor.to_string(),
                reason: "no value given".to_string(),
            });
        }
        Ok(())
    }

    async fn create(&self, descriptor: &SecretRef, desired: &SecretSpec) -> Result<Value> {
        self.write(descriptor, desired).await
    }

    fn diverges(&self, observed: &Value, desired: &SecretSpec) -> bool {
        desired.value().is_some_and(|value| {
            observed.pointer("/value/raw").and_then(Value::as_str) != Some(value)
        })
    }

    async fn update(&self, descriptor: &SecretRef, desired: &SecretSpec) -> Result<Value> {
        self.write(descriptor, desired).await
    }

    async fn delete(&self, descriptor: &SecretRef) -> Result<Value> {
        self.submit(
            descriptor,
            json!({
                "name": descriptor.name(),
                "originalName": descriptor.name(),
                "value": null,
                "shouldDelete": true,
            }),
        )
        .await
    }
}
