//! # Reconciler
//!
//! Converges one remote resource to a desired state with the smallest
//! possible mutation.
//!
//! ## Flow
//!
//! 1. **Fetch** current state (missing, present, or a failure that stops here)
//! 2. **Plan** the action: create, update, delete, or nothing
//! 3. **Apply** the action, at most one mutating call
//!
//! The fetch and the mutation are awaited one after the other: the mutation is
//! only correct for the state that was just observed.
//!
//! Each resource kind supplies its endpoints through [`ResourceOps`]. Kinds
//! without an update (environment, config, integration) compare existence
//! only; kinds without a delete (integration) fail with
//! [`DopplerError::Unsupported`] when asked to remove something.

use crate::classifier::Classified;
use crate::error::{DopplerError, Result};
use crate::observability::metrics;
use crate::resources::ResourceKind;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, info_span, Instrument};

/// Whether the resource should exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Present,
    Absent,
}

/// Current state of a resource as returned by a fetch
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Missing,
    Present(Value),
}

impl From<Classified> for Observed {
    fn from(classified: Classified) -> Self {
        match classified {
            Classified::NotFound => Self::Missing,
            Classified::Found(payload) => Self::Present(payload),
        }
    }
}

impl Observed {
    #[must_use]
    pub fn into_payload(self) -> Option<Value> {
        match self {
            Self::Missing => None,
            Self::Present(payload) => Some(payload),
        }
    }
}

/// What reconciliation will do, or did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
    Unchanged,
    AlreadyAbsent,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Unchanged => "unchanged",
            Self::AlreadyAbsent => "already_absent",
        }
    }

    #[must_use]
    pub fn mutates(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision taken after the fetch
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub action: Action,
    pub observed: Observed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    /// True only when a mutating call was issued and succeeded
    pub changed: bool,
    pub action: Action,
    pub resource: Option<Value>,
}

/// Endpoints of one resource kind
#[async_trait]
pub trait ResourceOps: Send + Sync {
    /// Key fields identifying one remote object
    type Descriptor: fmt::Display + Send + Sync;
    /// Target attributes supplied by the caller
    type Desired: Send + Sync;

    const KIND: ResourceKind;

    async fn fetch(&self, descriptor: &Self::Descriptor) -> Result<Observed>;

    /// Fails with [`DopplerError::InsufficientDesiredState`] when `desired`
    /// lacks what a create needs
    fn check_creatable(&self, _descriptor: &Self::Descriptor, _desired: &Self::Desired) -> Result<()> {
        Ok(())
    }

    async fn create(&self, descriptor: &Self::Descriptor, desired: &Self::Desired) -> Result<Value>;

    /// Whether an existing resource differs from `desired` in a field this kind can update
    fn diverges(&self, _observed: &Value, _desired: &Self::Desired) -> bool {
        false
    }

    async fn update(&self, _descriptor: &Self::Descriptor, _desired: &Self::Desired) -> Result<Value> {
        Err(DopplerError::Unsupported {
            kind: Self::KIND,
            operation: "update",
        })
    }

    async fn delete(&self, _descriptor: &Self::Descriptor) -> Result<Value> {
        Err(DopplerError::Unsupported {
            kind: Self::KIND,
            operation: "delete",
        })
    }
}

/// Fetch and decide, without mutating anything.
///
/// # Errors
/// Fetch failures, and [`DopplerError::InsufficientDesiredState`] when a
/// create would be needed but `desired` cannot support it.
pub async fn plan<O: ResourceOps>(
    ops: &O,
    descriptor: &O::Descriptor,
    desired: &O::Desired,
    state: State,
) -> Result<Plan> {
    let observed = ops.fetch(descriptor).await?;

    let action = match (state, &observed) {
        (State::Present, Observed::Missing) => {
            ops.check_creatable(descriptor, desired)?;
            Action::Create
        }
        (State::Present, Observed::Present(current)) => {
            if ops.diverges(current, desired) {
                Action::Update
            } else {
                Action::Unchanged
            }
        }
        (State::Absent, Observed::Missing) => Action::AlreadyAbsent,
        (State::Absent, Observed::Present(_)) => Action::Delete,
    };

    debug!("{} {}: planned {}", O::KIND, descriptor, action);
    Ok(Plan { action, observed })
}

/// Carry out a plan produced by [`plan`].
///
/// # Errors
/// Failures of the mutating call.
pub async fn apply<O: ResourceOps>(
    ops: &O,
    descriptor: &O::Descriptor,
    desired: &O::Desired,
    plan: Plan,
) -> Result<ReconciliationResult> {
    let resource = match plan.action {
        Action::Create => {
            info!("Creating {} {}", O::KIND, descriptor);
            Some(ops.create(descriptor, desired).await?)
        }
        Action::Update => {
            info!("Updating {} {}", O::KIND, descriptor);
            Some(ops.update(descriptor, desired).await?)
        }
        Action::Delete => {
            info!("Deleting {} {}", O::KIND, descriptor);
            Some(ops.delete(descriptor).await?)
        }
        Action::Unchanged | Action::AlreadyAbsent => plan.observed.into_payload(),
    };

    Ok(ReconciliationResult {
        changed: plan.action.mutates(),
        action: plan.action,
        resource,
    })
}

/// Converge `descriptor` to `desired` under `state`.
///
/// # Errors
/// Any failure of the fetch, the plan or the mutation. Nothing is rolled back.
pub async fn reconcile<O: ResourceOps>(
    ops: &O,
    descriptor: &O::Descriptor,
    desired: &O::Desired,
    state: State,
) -> Result<ReconciliationResult> {
    let span = info_span!(
        "doppler.reconcile",
        resource.kind = %O::KIND,
        resource.id = %descriptor,
    );

    async move {
        let outcome = match plan(ops, descriptor, desired, state).await {
            Ok(plan) => apply(ops, descriptor, desired, plan).await,
            Err(e) => Err(e),
        };
        match &outcome {
            Ok(result) => metrics::record_reconciliation(O::KIND.as_str(), result.action.as_str()),
            Err(_) => metrics::increment_reconciliation_errors(O::KIND.as_str()),
        }
        outcome
    }
    .instrument(span)
    .await
}

/// Check mode: report the planned action and the observed resource with
/// `changed` left false.
///
/// # Errors
/// Same as [`plan`].
pub async fn preview<O: ResourceOps>(
    ops: &O,
    descriptor: &O::Descriptor,
    desired: &O::Desired,
    state: State,
) -> Result<ReconciliationResult> {
    let plan = plan(ops, descriptor, desired, state).await?;
    info!("Check mode: would {} {} {}", plan.action, O::KIND, descriptor);
    Ok(ReconciliationResult {
        changed: false,
        action: plan.action,
        resource: plan.observed.into_payload(),
    })
}
