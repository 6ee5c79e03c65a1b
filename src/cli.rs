//! # dopplerctl CLI
//!
//! Command-line surface for converging Doppler resources.
//!
//! ## Usage
//!
//! ```bash
//! # Ensure a project exists with a description
//! dopplerctl project --project backend --description "Backend services"
//!
//! # Ensure an environment exists (slug derived from the name)
//! dopplerctl environment --project backend --environment "QA Team"
//!
//! # Set a secret without echoing its value back
//! dopplerctl secret --project backend --config dev --name API_KEY --value s3cr3t --return-value false
//!
//! # Preview a deletion
//! dopplerctl --check config --project backend --environment dev --name dev_old --state absent
//!
//! # Read one secret value
//! dopplerctl lookup --project backend --config dev --name API_KEY
//! ```
//!
//! Every flag left unset falls back to its `DOPPLER_*` environment variable.

use crate::client::DopplerClient;
use crate::config::{settings, ConfigResolver, ConnectionArgs, ConnectionSettings};
use crate::constants::DEFAULT_LOOKUP_FIELD;
use crate::error::Result;
use crate::lookup;
use crate::reconciler::{self, ReconciliationResult, ResourceOps, State};
use crate::report;
use crate::resources::secret::withhold_value;
use crate::resources::{
    ConfigRef, Configs, EnvironmentRef, Environments, IntegrationRef, IntegrationSpec,
    Integrations, ProjectRef, ProjectSpec, Projects, SecretRef, SecretSpec, Secrets,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_GIT_HASH"),
    " ",
    env!("BUILD_DATETIME"),
    ")"
);

/// Converge Doppler projects, environments, configs, secrets and integrations
#[derive(Debug, Parser)]
#[command(name = "dopplerctl", version, long_version = LONG_VERSION)]
#[command(
    about = "Declarative management of Doppler resources",
    long_about = None,
    after_help = "\
Connection settings fall back to DOPPLER_TOKEN, DOPPLER_URL, DOPPLER_TIMEOUT
and DOPPLER_VALIDATE_CERTS. Resource flags fall back to DOPPLER_<FLAG>.

Examples:
  dopplerctl project --project backend
  dopplerctl secret --project backend --config dev --name API_KEY --value s3cr3t
  dopplerctl lookup --project backend --config dev --name API_KEY
"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub connection: ConnectionFlags,

    /// Report what would change without changing anything
    #[arg(long, global = true)]
    pub check: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write Prometheus text metrics to this file after the run
    #[arg(long, global = true, value_name = "PATH")]
    pub metrics_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionFlags {
    /// Doppler API base URL
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Doppler API token
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Verify the server certificate
    #[arg(long, global = true, value_name = "BOOL")]
    pub validate_certs: Option<bool>,
}

impl From<&ConnectionFlags> for ConnectionArgs {
    fn from(flags: &ConnectionFlags) -> Self {
        Self {
            url: flags.url.clone(),
            token: flags.token.clone(),
            timeout: flags.timeout,
            validate_certs: flags.validate_certs,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage a project
    Project {
        #[arg(long, alias = "name")]
        project: Option<String>,

        /// Defaults to "Project <name>"
        #[arg(long)]
        description: Option<String>,

        #[arg(long, value_enum, default_value_t = State::Present)]
        state: State,

        /// List every project instead
        #[arg(long)]
        list: bool,
    },
    /// Manage an environment of a project
    Environment {
        #[arg(long)]
        project: Option<String>,

        /// Display name
        #[arg(long)]
        environment: Option<String>,

        /// Defaults to the snake_case form of the name
        #[arg(long)]
        slug: Option<String>,

        #[arg(long, value_enum, default_value_t = State::Present)]
        state: State,

        /// List the project's environments instead
        #[arg(long)]
        list: bool,
    },
    /// Manage a config of an environment
    Config {
        #[arg(long)]
        project: Option<String>,

        /// Environment slug
        #[arg(long)]
        environment: Option<String>,

        /// Config name, normalised to snake_case
        #[arg(long, alias = "config")]
        name: Option<String>,

        #[arg(long, value_enum, default_value_t = State::Present)]
        state: State,

        /// List the environment's configs instead
        #[arg(long)]
        list: bool,
    },
    /// Manage a secret of a config
    Secret {
        #[arg(long)]
        project: Option<String>,

        #[arg(long)]
        config: Option<String>,

        #[arg(long)]
        name: Option<String>,

        /// Raw value; required to create, compared to decide an update
        #[arg(long)]
        value: Option<String>,

        #[arg(long, value_enum, default_value_t = State::Present)]
        state: State,

        /// Include the secret value in the output
        #[arg(long, default_value_t = true, action = ArgAction::Set, value_name = "BOOL")]
        return_value: bool,
    },
    /// Manage an integration
    Integration {
        #[arg(long, alias = "name")]
        integration: Option<String>,

        /// Integration type, required to create
        #[arg(long = "type")]
        integration_type: Option<String>,

        /// Extra create field, repeatable
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,

        #[arg(long, value_enum, default_value_t = State::Present)]
        state: State,

        /// List every integration instead
        #[arg(long)]
        list: bool,
    },
    /// Print one field of a secret
    Lookup {
        #[arg(long)]
        project: Option<String>,

        #[arg(long)]
        config: Option<String>,

        #[arg(long)]
        name: Option<String>,

        /// Dot-separated path into the secret
        #[arg(long, default_value = DEFAULT_LOOKUP_FIELD)]
        field: String,
    },
}

/// What a successful run prints on stdout
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Json(Value),
    Text(String),
}

/// Run one parsed command.
///
/// Settings are resolved before the first request, so a missing token or
/// key field fails without touching the network.
///
/// # Errors
/// Any [`crate::error::DopplerError`] raised along the way.
pub async fn execute(cli: &Cli, resolver: &ConfigResolver) -> Result<Outcome> {
    let connection = ConnectionSettings::resolve(resolver, &ConnectionArgs::from(&cli.connection))?;

    match &cli.command {
        Command::Project {
            project,
            description,
            state,
            list,
        } => {
            if *list {
                let client = DopplerClient::new(&connection)?;
                return Ok(Outcome::Json(report::listing(Projects::new(client).list().await?)));
            }
            let descriptor = ProjectRef::new(resolver.require(&settings::PROJECT, project.as_deref())?);
            let description = resolver.resolve(&settings::DESCRIPTION, description.as_deref())?;
            let desired = ProjectSpec::new(&descriptor, description);
            let ops = Projects::new(DopplerClient::new(&connection)?);
            converge(&ops, &descriptor, &desired, *state, cli.check).await
        }
        Command::Environment {
            project,
            environment,
            slug,
            state,
            list,
        } => {
            let project = resolver.require(&settings::PROJECT, project.as_deref())?;
            if *list {
                let client = DopplerClient::new(&connection)?;
                let listed = Environments::new(client).list(&project).await?;
                return Ok(Outcome::Json(report::listing(listed)));
            }
            let descriptor = EnvironmentRef::new(
                project,
                resolver.resolve(&settings::ENVIRONMENT, environment.as_deref())?,
                resolver.resolve(&settings::ENVIRONMENT_SLUG, slug.as_deref())?,
            )?;
            let ops = Environments::new(DopplerClient::new(&connection)?);
            converge(&ops, &descriptor, &(), *state, cli.check).await
        }
        Command::Config {
            project,
            environment,
            name,
            state,
            list,
        } => {
            let project = resolver.require(&settings::PROJECT, project.as_deref())?;
            let environment = resolver.require(&settings::ENVIRONMENT, environment.as_deref())?;
            if *list {
                let client = DopplerClient::new(&connection)?;
                let listed = Configs::new(client).list(&project, &environment).await?;
                return Ok(Outcome::Json(report::listing(listed)));
            }
            let name = resolver.require(&settings::CONFIG, name.as_deref())?;
            let descriptor = ConfigRef::new(project, environment, &name)?;
            let ops = Configs::new(DopplerClient::new(&connection)?);
            converge(&ops, &descriptor, &(), *state, cli.check).await
        }
        Command::Secret {
            project,
            config,
            name,
            value,
            state,
            return_value,
        } => {
            let descriptor = secret_ref(resolver, project.as_deref(), config.as_deref(), name.as_deref())?;
            let desired = SecretSpec::new(value.clone());
            let ops = Secrets::new(DopplerClient::new(&connection)?);
            let mut result = run(&ops, &descriptor, &desired, *state, cli.check).await?;
            if !return_value {
                if let Some(resource) = result.resource.as_mut() {
                    withhold_value(resource);
                }
            }
            Ok(Outcome::Json(report::success(&result)))
        }
        Command::Integration {
            integration,
            integration_type,
            fields,
            state,
            list,
        } => {
            if *list {
                let client = DopplerClient::new(&connection)?;
                return Ok(Outcome::Json(report::listing(Integrations::new(client).list().await?)));
            }
            let descriptor =
                IntegrationRef::new(resolver.require(&settings::INTEGRATION, integration.as_deref())?);
            let desired = IntegrationSpec::from_pairs(integration_type.clone(), fields)?;
            let ops = Integrations::new(DopplerClient::new(&connection)?);
            converge(&ops, &descriptor, &desired, *state, cli.check).await
        }
        Command::Lookup {
            project,
            config,
            name,
            field,
        } => {
            let descriptor = secret_ref(resolver, project.as_deref(), config.as_deref(), name.as_deref())?;
            let client = DopplerClient::new(&connection)?;
            let value = lookup::lookup(&client, &descriptor, field).await?;
            Ok(Outcome::Text(lookup::render(&value)))
        }
    }
}

fn secret_ref(
    resolver: &ConfigResolver,
    project: Option<&str>,
    config: Option<&str>,
    name: Option<&str>,
) -> Result<SecretRef> {
    Ok(SecretRef::new(
        resolver.require(&settings::PROJECT, project)?,
        resolver.require(&settings::CONFIG, config)?,
        resolver.require(&settings::SECRET_NAME, name)?,
    ))
}

async fn run<O: ResourceOps>(
    ops: &O,
    descriptor: &O::Descriptor,
    desired: &O::Desired,
    state: State,
    check: bool,
) -> Result<ReconciliationResult> {
    if check {
        reconciler::preview(ops, descriptor, desired, state).await
    } else {
        reconciler::reconcile(ops, descriptor, desired, state).await
    }
}

async fn converge<O: ResourceOps>(
    ops: &O,
    descriptor: &O::Descriptor,
    desired: &O::Desired,
    state: State,
    check: bool,
) -> Result<Outcome> {
    let result = run(ops, descriptor, desired, state, check).await?;
    Ok(Outcome::Json(report::success(&result)))
}
