//! # Doppler Manager
//!
//! Declarative management of Doppler resources over the Doppler v3 REST API.
//!
//! ## Overview
//!
//! Every managed resource (project, environment, config, secret, integration)
//! goes through the same cycle:
//!
//! 1. **Resolve settings** - explicit values, then `DOPPLER_*` environment variables, then defaults
//! 2. **Fetch** the current remote state
//! 3. **Classify** the response: found, not found, or a failure carrying the request
//! 4. **Plan and apply** the smallest mutation that reaches the desired state
//!
//! A read-only [`lookup`] returns one field of a secret.
//!
//! Unit tests live next to the code; contract tests against a Pact mock
//! server live in `tests/`.

pub mod classifier;
pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod lookup;
pub mod observability;
pub mod reconciler;
pub mod report;
pub mod resources;

pub use client::DopplerClient;
pub use config::{ConfigResolver, ConnectionSettings};
pub use error::{DopplerError, Result};
