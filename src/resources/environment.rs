//! Doppler environments.
//!
//! Existence only: the API offers no update for an environment.

use super::{fetch_all, fetch_one, mutation_payload, to_snake_case, ResourceKind};
use crate::classifier::NotFoundPolicy;
use crate::client::DopplerClient;
use crate::error::{DopplerError, Result};
use crate::reconciler::{Observed, ResourceOps};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;

const ENVIRONMENTS_PATH: &str = "/environments";
const ENVIRONMENT_PATH: &str = "/environments/environment";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentRef {
    project: String,
    name: String,
    slug: String,
}

impl EnvironmentRef {
    /// Build from a display name, a slug, or both.
    ///
    /// A missing slug is the snake_case form of the name; a missing name is
    /// the slug.
    ///
    /// # Errors
    /// [`DopplerError::InvalidConfig`] when neither is given.
    pub fn new(
        project: impl Into<String>,
        name: Option<String>,
        slug: Option<String>,
    ) -> Result<Self> {
        let (name, slug) = match (name, slug) {
            (Some(name), Some(slug)) => (name, slug),
            (Some(name), None) => {
                let slug = to_snake_case(&name);
                (name, slug)
            }
            (None, Some(slug)) => (slug.clone(), slug),
            (None, None) => {
                return Err(DopplerError::InvalidConfig {
                    name: "environment".to_string(),
                    reason: "Either environment or slug must be provided".to_string(),
                })
            }
        };
        Ok(Self {
            project: project.into(),
            name,
            slug,
        })
    }

    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }
}

impl fmt::Display for EnvironmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.slug)
    }
}

#[derive(Debug, Clone)]
pub struct Environments {
    client: DopplerClient,
}

impl Environments {
    #[must_use]
    pub fn new(client: DopplerClient) -> Self {
        Self { client }
    }

    /// Every environment of `project`
    ///
    /// # Errors
    /// Any non-200 response.
    pub async fn list(&self, project: &str) -> Result<Value> {
        fetch_all(&self.client, ENVIRONMENTS_PATH, &[("project", project)]).await
    }
}

#[async_trait]
impl ResourceOps for Environments {
    type Descriptor = EnvironmentRef;
    type Desired = ();

    const KIND: ResourceKind = ResourceKind::Environment;

    async fn fetch(&self, descriptor: &EnvironmentRef) -> Result<Observed> {
        fetch_one(
            &self.client,
            ENVIRONMENT_PATH,
            &[
                ("project", descriptor.project()),
                ("environment", descriptor.slug()),
            ],
            NotFoundPolicy::MissingOrBadRequest,
        )
        .await
    }

    async fn create(&self, descriptor: &EnvironmentRef, _desired: &()) -> Result<Value> {
        let body = json!({
            "project": descriptor.project(),
            "name": descriptor.name(),
            "slug": descriptor.slug(),
        });
        mutation_payload(self.client.post(ENVIRONMENTS_PATH, body).await?)
    }

    async fn delete(&self, descriptor: &EnvironmentRef) -> Result<Value> {
        let body = json!({
            "project": descriptor.project(),
            "environment": descriptor.slug(),
        });
        mutation_payload(self.client.delete(ENVIRONMENT_PATH, body).await?)
    }
}
