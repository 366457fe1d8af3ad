//! Optional TOML configuration at `~/.config/ionos-converge/config.toml`.
//!
//! ```toml
//! [connection]
//! api_url = "https://api.ionos.com/cloudapi/v6"
//! token = "..."
//!
//! [defaults]
//! wait_timeout = 900
//! poll_interval = 5
//! poll_max = 5
//! ```

use crate::cli::{ConnectionArgs, ReconcileArgs};
use anyhow::{Context, Result};
use converge::{Backoff, PollConfig, ReconcileOptions};
use ionoskit::{ClientConfig, Credentials};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("ionos-converge"))
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Expansion depth for reads
    pub depth: Option<u8>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub wait: Option<bool>,
    pub wait_timeout: Option<u64>,
    pub allow_replace: Option<bool>,
    pub poll_interval: Option<f64>,
    pub poll_max: Option<f64>,
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => {
                let path = PathBuf::from(shellexpand::tilde(p).as_ref());
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Self::load_from(&path)
            }
            None => Self::load_from(&config_dir()?.join("config.toml")),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Client settings from flags/environment, falling back to this file
    pub fn client_config(&self, args: &ConnectionArgs) -> Result<ClientConfig> {
        let conn = &self.connection;
        let credentials = Credentials::resolve(
            args.token.clone().or_else(|| conn.token.clone()),
            args.username.clone().or_else(|| conn.username.clone()),
            args.password.clone().or_else(|| conn.password.clone()),
        )?;

        let mut config = ClientConfig::new(credentials)
            .with_user_agent(format!("ionos-converge/{}", env!("CARGO_PKG_VERSION")));
        if let Some(url) = args.api_url.as_ref().or(conn.api_url.as_ref()) {
            config = config.with_api_url(url.as_str());
        }
        if let Some(depth) = conn.depth {
            config = config.with_depth(depth);
        }
        Ok(config)
    }

    /// Engine options from flags, falling back to this file
    pub fn reconcile_options(&self, args: &ReconcileArgs) -> Result<ReconcileOptions> {
        let defaults = &self.defaults;
        let base = ReconcileOptions::default();

        let wait = !args.no_wait && defaults.wait.unwrap_or(base.wait);
        let wait_timeout = args
            .wait_timeout
            .or(defaults.wait_timeout)
            .map(Duration::from_secs)
            .unwrap_or(base.wait_timeout);
        let allow_replace = args.allow_replace || defaults.allow_replace.unwrap_or(false);

        let interval = args.poll_interval.or(defaults.poll_interval);
        let max = args.poll_max.or(defaults.poll_max);
        let poll = if interval.is_none() && max.is_none() {
            base.poll
        } else {
            let initial_delay = match interval {
                Some(secs) => seconds("poll interval", secs)?,
                None => base.poll.initial_delay,
            };
            let max_delay = match max {
                Some(secs) => seconds("poll max", secs)?,
                None => base.poll.max_delay,
            };
            PollConfig {
                initial_delay,
                max_delay: max_delay.max(initial_delay),
                backoff: Backoff::Exponential { factor: 2.0 },
            }
        };

        Ok(ReconcileOptions {
            wait,
            wait_timeout,
            allow_replace,
            poll,
        })
    }
}

/// A non-negative, finite number of seconds
fn seconds(what: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("Invalid {what}: {secs} is not a usable number of seconds"))
}
