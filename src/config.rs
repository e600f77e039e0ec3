//! Environment-driven configuration.
//!
//! Credentials for the external services live in the process environment,
//! optionally seeded from a `.env.local` file next to the worker binary.

use crate::error::{Error, Result};

/// Env file loaded by [`load_env_file`].
pub const ENV_FILE: &str = ".env.local";

/// Connection credentials for the realtime log channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeCredentials {
    pub endpoint: String,
    pub access_key: String,
}

impl RealtimeCredentials {
    pub const ENDPOINT_VAR: &'static str = "SUPABASE_REALTIME_URL";
    pub const ACCESS_KEY_VAR: &'static str = "SUPABASE_ANON_KEY";

    /// Read both credentials from the environment. Returns `None` when
    /// either is missing; the broadcaster treats that as a soft failure,
    /// not a configuration error.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let endpoint = non_empty_var(Self::ENDPOINT_VAR)?;
        let access_key = non_empty_var(Self::ACCESS_KEY_VAR)?;
        Some(Self { endpoint, access_key })
    }
}

/// Worker-level configuration for one assistant deployment.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Base URL of the medical-data / emergency-info backend.
    pub backend_base_url: String,
    /// Realtime credentials for the status broadcaster, when configured.
    pub realtime: Option<RealtimeCredentials>,
}

impl AgentConfig {
    pub const BACKEND_VAR: &'static str = "BACKEND_BASE_URL";

    /// Resolve the configuration from the environment.
    ///
    /// # Errors
    /// Returns [`Error::MissingEnv`] when the backend base URL is not set;
    /// realtime credentials stay optional.
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> Result<Self> {
        let backend_base_url =
            non_empty_var(Self::BACKEND_VAR).ok_or(Error::MissingEnv(Self::BACKEND_VAR))?;
        Ok(Self {
            backend_base_url,
            realtime: RealtimeCredentials::from_env(),
        })
    }
}

/// Load `.env.local` into the process environment. A missing file is fine;
/// a malformed one is logged and otherwise ignored.
pub fn load_env_file() {
    match dotenvy::from_filename(ENV_FILE) {
        Ok(_) => tracing::debug!(file = ENV_FILE, "loaded environment file"),
        Err(dotenvy::Error::Io(_)) => {}
        Err(err) => tracing::warn!(file = ENV_FILE, error = %err, "failed to parse environment file"),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
