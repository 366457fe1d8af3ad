// Resource reconciliation
pub mod reconcile;

// Read-only listing
pub mod info;

use crate::cli::ConnectionArgs;
use crate::config::Config;
use anyhow::{Context as _, Result};
use converge::{Action, ReconcileError};
use ionoskit::Client;
use serde_json::{Value, json};

/// Build an API client from flags, environment and config file
pub fn connect(config: &Config, connection: &ConnectionArgs) -> Result<Client> {
    let client_config = config
        .client_config(connection)
        .context("Could not configure the API client")?;
    log::debug!("Using API at {}", client_config.api_url);
    Ok(Client::new(client_config))
}

/// Failure mapping reported on stdout
pub fn failure_output(action: Action, msg: &str) -> Value {
    json!({
        "changed": false,
        "failed": true,
        "action": action.to_string(),
        "msg": msg,
    })
}

pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report `err` on stdout and stderr, then hand it back for the exit status
pub fn fail(err: ReconcileError) -> Result<()> {
    print_json(&failure_output(err.action, &err.to_string()))?;
    crate::ui::error(&err.to_string());
    crate::ui::dim(err.category().advice());
    Err(err.into())
}
