//! Doppler configs.
//!
//! Existence only. Config names are normalised to snake_case before use.

use super::{fetch_all, fetch_one, mutation_payload, to_snake_case, ResourceKind};
use crate::classifier::NotFoundPolicy;
use crate::client::DopplerClient;
use crate::error::{DopplerError, Result};
use crate::reconciler::{Observed, ResourceOps};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;

const CONFIGS_PATH: &str = "/configs";
const CONFIG_PATH: &str = "/configs/config";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRef {
    project: String,
    environment: String,
    name: String,
}

impl ConfigRef {
    /// # Errors
    /// [`DopplerError::InvalidConfig`] when the name normalises to nothing.
    pub fn new(
        project: impl Into<String>,
        environment: impl Into<String>,
        name: &str,
    ) -> Result<Self> {
        let name = to_snake_case(name);
        if name.is_empty() {
            return Err(DopplerError::InvalidConfig {
                name: "config".to_string(),
                reason: "A config name must be provided".to_string(),
            });
        }
        Ok(Self {
            project: project.into(),
            environment: environment.into(),
            name,
        })
    }

    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ConfigRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.environment, self.name)
    }
}

#[derive(Debug, Clone)]
pub struct Configs {
    client: DopplerClient,
}

impl Configs {
    #[must_use]
    pub fn new(client: DopplerClient) -> Self {
        Self { client }
    }

    /// Every config of `environment` in `project`
    ///
    /// # Errors
    /// Any non-200 response.
    pub async fn list(&self, project: &str, environment: &str) -> Result<Value> {
        fetch_all(
            &self.client,
            CONFIGS_PATH,
            &[("project", project), ("environment", environment)],
        )
        .await
    }
}

#[async_trait]
impl ResourceOps for Configs {
    type Descriptor = ConfigRef;
    type Desired = ();

    const KIND: ResourceKind = ResourceKind::Config;

    async fn fetch(&self, descriptor: &ConfigRef) -> Result<Observed> {
        fetch_one(
            &self.client,
            CONFIG_PATH,
            &[
                ("project", descriptor.project()),
                ("environment", descriptor.environment()),
                ("config", descriptor.name()),
            ],
            NotFoundPolicy::MissingOrBadRequest,
        )
        .await
    }

    async fn create(&self, descriptor: &ConfigRef, _desired: &()) -> Result<Value> {
        let body = json!({
            "project": descriptor.project(),
            "environment": descriptor.environment(),
            "name": descriptor.name(),
        });
        mutation_payload(self.client.post(CONFIGS_PATH, body).await?)
    }

    async fn delete(&self, descriptor: &ConfigRef) -> Result<Value> {
        let body = json!({
            "project": descriptor.project(),
            "config": descriptor.name(),
        });
        mutation_payload(self.client.delete(CONFIG_PATH, body).await?)
    }
}
