// src/config.rs
//! Runtime configuration.
//!
//! Values are layered as:
//! 1. Built-in defaults
//! 2. `DIDTOOL_*` environment variables (a `.env` file is loaded first by `main`)
//! 3. Command-line overrides such as `--pds`
//!
//! ## Environment Variables
//! - `DIDTOOL_PDS_URL`: Identity provider (default: https://bsky.social)
//! - `DIDTOOL_PLC_URL`: `did:plc` directory (default: https://plc.directory)
//! - `DIDTOOL_PASSWORD`: (Optional) account password, prompted for when unset

use crate::errors::DidError;
use config::{Config, Environment};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "DIDTOOL";
pub const DEFAULT_PDS_URL: &str = "https://bsky.social";
pub const DEFAULT_PLC_URL: &str = "https://plc.directory";

/// Endpoints and secrets for one invocation.
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub pds_url: String,
    pub plc_url: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("pds_url", &self.pds_url)
            .field("plc_url", &self.plc_url)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Settings {
    /// Loads settings from the process environment.
    pub fn load() -> Result<Self, DidError> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(environment: Environment) -> Result<Self, DidError> {
        let settings = Config::builder()
            .set_default("pds_url", DEFAULT_PDS_URL)?
            .set_default("plc_url", DEFAULT_PLC_URL)?
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Replaces the provider URL when one was given on the command line.
    pub fn with_pds(mut self, pds_url: Option<&str>) -> Self {
        if let Some(pds_url) = pds_url {
            self.pds_url = pds_url.to_string();
        }
        self
    }
}
