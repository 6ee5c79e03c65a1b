//! # Configuration
//!
//! Every setting is resolved once per invocation through the same chain:
//! explicit value, then environment variable, then default. A required setting
//! with no value anywhere fails with [`DopplerError::MissingConfig`] before
//! any request is made.
//!
//! The environment variable of a setting is `DOPPLER_<NAME>` unless the
//! setting names one explicitly.

use crate::constants::{DEFAULT_TIMEOUT_SECS, DEFAULT_URL, DEFAULT_VALIDATE_CERTS, ENV_PREFIX};
use crate::error::{DopplerError, Result};
use std::fmt;
use std::time::Duration;
use zeroize::Zeroizing;

/// Description of a single named setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    pub name: &'static str,
    env_var: Option<&'static str>,
    pub required: bool,
    pub default: Option<&'static str>,
}

impl Setting {
    #[must_use]
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            env_var: None,
            required: true,
            default: None,
        }
    }

    #[must_use]
    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            env_var: None,
            required: false,
            default: None,
        }
    }

    /// Use `env_var` instead of the derived `DOPPLER_<NAME>`
    #[must_use]
    pub const fn with_env(self, env_var: &'static str) -> Self {
        Self {
            env_var: Some(env_var),
            ..self
        }
    }

    #[must_use]
    pub const fn with_default(self, default: &'static str) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }

    /// Name of the environment variable consulted for this setting
    #[must_use]
    pub fn env_var(&self) -> String {
        match self.env_var {
            Some(var) => var.to_string(),
            None => derive_env_var(self.name),
        }
    }
}

/// `project` -> `DOPPLER_PROJECT`, `validate-certs` -> `DOPPLER_VALIDATE_CERTS`
#[must_use]
pub fn derive_env_var(name: &str) -> String {
    format!("{ENV_PREFIX}{}", name.to_uppercase().replace('-', "_"))
}

/// Settings shared by every command
pub mod settings {
    use super::Setting;

    pub const TOKEN: Setting = Setting::required("token");
    pub const URL: Setting = Setting::optional("url");
    pub const TIMEOUT: Setting = Setting::optional("timeout");
    pub const VALIDATE_CERTS: Setting = Setting::optional("validate_certs");
    pub const PROJECT: Setting = Setting::required("project");
    pub const CONFIG: Setting = Setting::required("config");
    pub const ENVIRONMENT: Setting = Setting::optional("environment");
    pub const ENVIRONMENT_SLUG: Setting =
        Setting::optional("slug").with_env("DOPPLER_ENVIRONMENT_SLUG");
    pub const SECRET_NAME: Setting = Setting::required("name");
    pub const DESCRIPTION: Setting = Setting::optional("description");
    pub const INTEGRATION: Setting = Setting::required("integration");
}

type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Resolves settings from explicit values with an environment fallback
pub struct ConfigResolver {
    lookup: Box<EnvLookup>,
}

impl fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigResolver").finish_non_exhaustive()
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ConfigResolver {
    /// Resolver backed by the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    /// Resolver backed by an arbitrary lookup, e.g. a map in tests
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }

    /// Resolve `setting`, preferring a non-empty `explicit` value.
    ///
    /// # Errors
    /// [`DopplerError::MissingConfig`] when the setting is required and has
    /// no explicit value, no environment value and no default.
    pub fn resolve(&self, setting: &Setting, explicit: Option<&str>) -> Result<Option<String>> {
        if let Some(value) = explicit.filter(|v| !v.is_empty()) {
            return Ok(Some(value.to_string()));
        }

        let env_var = setting.env_var();
        if let Some(value) = (self.lookup)(&env_var).filter(|v| !v.is_empty()) {
            tracing::debug!("Setting {} taken from {}", setting.name, env_var);
            return Ok(Some(value));
        }

        if let Some(default) = setting.default {
            return Ok(Some(default.to_string()));
        }

        if setting.required {
            return Err(DopplerError::MissingConfig {
                name: setting.name.to_string(),
                env_var,
            });
        }
        Ok(None)
    }

    /// Resolve a setting that must end up with a value, whatever its flag says.
    ///
    /// # Errors
    /// [`DopplerError::MissingConfig`] when nothing is found.
    pub fn require(&self, setting: &Setting, explicit: Option<&str>) -> Result<String> {
        let required = Setting {
            required: true,
            ..*setting
        };
        self.resolve(&required, explicit)?
            .ok_or_else(|| DopplerError::MissingConfig {
                name: setting.name.to_string(),
                env_var: setting.env_var(),
            })
    }

    /// Resolve a numeric setting, falling back to `default`.
    ///
    /// # Errors
    /// [`DopplerError::InvalidConfig`] when the environment value is not a number.
    pub fn resolve_u64(&self, setting: &Setting, explicit: Option<u64>, default: u64) -> Result<u64> {
        if let Some(value) = explicit {
            return Ok(value);
        }
        match self.resolve(setting, None)? {
            Some(raw) => raw.trim().parse().map_err(|e| DopplerError::InvalidConfig {
                name: setting.name.to_string(),
                reason: format!("'{raw}' is not a whole number of seconds ({e})"),
            }),
            None => Ok(default),
        }
    }

    /// Resolve a boolean setting, falling back to `default`.
    ///
    /// # Errors
    /// [`DopplerError::InvalidConfig`] when the environment value is not a boolean.
    pub fn resolve_bool(
        &self,
        setting: &Setting,
        explicit: Option<bool>,
        default: bool,
    ) -> Result<bool> {
        if let Some(value) = explicit {
            return Ok(value);
        }
        match self.resolve(setting, None)? {
            Some(raw) => parse_bool(&raw).ok_or_else(|| DopplerError::InvalidConfig {
                name: setting.name.to_string(),
                reason: format!("'{raw}' is not a boolean"),
            }),
            None => Ok(default),
        }
    }
}

/// The base URL must be absolute http(s); reqwest only notices at request time
fn validate_url(url: &str) -> Result<()> {
    let invalid = |reason: String| DopplerError::InvalidConfig {
        name: settings::URL.name.to_string(),
        reason,
    };
    let parsed = reqwest::Url::parse(url).map_err(|e| invalid(format!("'{url}' is not a URL ({e})")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{other}' in '{url}'"))),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Connection values as supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConnectionArgs {
    pub url: Option<String>,
    pub token: Option<String>,
    pub timeout: Option<u64>,
    pub validate_certs: Option<bool>,
}

/// Fully resolved connection settings, immutable for the whole invocation
#[derive(Clone)]
pub struct ConnectionSettings {
    url: String,
    token: Zeroizing<String>,
    timeout: Duration,
    validate_certs: bool,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("validate_certs", &self.validate_certs)
            .finish_non_exhaustive()
    }
}

impl ConnectionSettings {
    #[must_use]
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: Zeroizing::new(token.into()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            validate_certs: DEFAULT_VALIDATE_CERTS,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_validate_certs(mut self, validate_certs: bool) -> Self {
        self.validate_certs = validate_certs;
        self
    }

    /// Resolve every connection setting from `args` and the environment.
    ///
    /// # Errors
    /// Fails when the token is missing or a value cannot be parsed.
    pub fn resolve(resolver: &ConfigResolver, args: &ConnectionArgs) -> Result<Self> {
        let token = resolver.require(&settings::TOKEN, args.token.as_deref())?;
        let url = resolver
            .resolve(&settings::URL, args.url.as_deref())?
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        let timeout = resolver.resolve_u64(&settings::TIMEOUT, args.timeout, DEFAULT_TIMEOUT_SECS)?;
        if timeout == 0 {
            return Err(DopplerError::InvalidConfig {
                name: settings::TIMEOUT.name.to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }
        validate_url(&url)?;
        let validate_certs = resolver.resolve_bool(
            &settings::VALIDATE_CERTS,
            args.validate_certs,
            DEFAULT_VALIDATE_CERTS,
        )?;

        Ok(Self::new(url.trim_end_matches('/'), token)
            .with_timeout(Duration::from_secs(timeout))
            .with_validate_certs(validate_certs))
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn validate_certs(&self) -> bool {
        self.validate_certs
    }
}
