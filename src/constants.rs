//! # Constants
//!
//! Shared constants used throughout the crate.
//!
//! These values represent reasonable defaults and can be overridden via
//! command-line flags or `DOPPLER_*` environment variables where applicable.

/// Prefix used to derive the fallback environment variable of a setting
pub const ENV_PREFIX: &str = "DOPPLER_";

/// Default base URL of the Doppler REST API
pub const DEFAULT_URL: &str = "https://api.doppler.com/v3";

/// Default per-request timeout (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Certificate validation is off unless requested
pub const DEFAULT_VALIDATE_CERTS: bool = false;

/// Field extracted by a secret lookup when none is given
pub const DEFAULT_LOOKUP_FIELD: &str = "value.computed";

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("dopplerctl/", env!("CARGO_PKG_VERSION"));

/// Note attached to a secret result when its value is withheld
pub const VALUE_WITHHELD_NOTE: &str = "Not returning value because return_value set to false";
