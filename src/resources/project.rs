//! Doppler projects.
//!
//! The only kind with both an update path and a list endpoint. Divergence is
//! judged on the description alone.

use super::{fetch_all, fetch_one, mutation_payload, ResourceKind};
use crate::classifier::NotFoundPolicy;
use crate::client::DopplerClient;
use crate::error::Result;
use crate::reconciler::{Observed, ResourceOps};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;

const PROJECTS_PATH: &str = "/projects";
const PROJECT_PATH: &str = "/projects/project";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    name: String,
}

impl ProjectRef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSpec {
    pub description: String,
}

impl ProjectSpec {
    /// Desired state for `project`; the description defaults to `Project <name>`
    #[must_use]
    pub fn new(project: &ProjectRef, description: Option<String>) -> Self {
        Self {
            description: description.unwrap_or_else(|| format!("Project {}", project.name())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Projects {
    client: DopplerClient,
}

impl Projects {
    #[must_use]
    pub fn new(client: DopplerClient) -> Self {
        Self { client }
    }

    /// Every project visible to the token
    ///
    /// # Errors
    /// Any non-200 response.
    pub async fn list(&self) -> Result<Value> {
        fetch_all(&self.client, PROJECTS_PATH, &[]).await
    }
}

#[async_trait]
impl ResourceOps for Projects {
    type Descriptor = ProjectRef;
    type Desired = ProjectSpec;

    const KIND: ResourceKind = ResourceKind::Project;

    async fn fetch(&self, descriptor: &ProjectRef) -> Result<Observed> {
        fetch_one(
            &self.client,
            PROJECT_PATH,
            &[("project", descriptor.name())],
            NotFoundPolicy::MissingOrBadRequest,
        )
        .await
    }

    async fn create(&self, descriptor: &ProjectRef, desired: &ProjectSpec) -> Result<Value> {
        let body = json!({
            "name": descriptor.name(),
            "description": desired.description,
        });
        mutation_payload(self.client.post(PROJECTS_PATH, body).await?)
    }

    fn diverges(&self, observed: &Value, desired: &ProjectSpec) -> bool {
        observed
            .pointer("/project/description")
            .and_then(Value::as_str)
            != Some(desired.description.as_str())
    }

    async fn update(&self, descriptor: &ProjectRef, desired: &ProjectSpec) -> Result<Value> {
        let body = json!({
            "project": descriptor.name(),
            "description": desired.description,
        });
        mutation_payload(self.client.post(PROJECT_PATH, body).await?)
    }

    async fn delete(&self, descriptor: &ProjectRef) -> Result<Value> {
        let body = json!({ "project": descriptor.name() });
        mutation_payload(self.client.delete(PROJECT_PATH, body).await?)
    }
}
