//! Composition root: wires configuration, persistence and the access-control
//! engine together.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use gatehouse_auth::{AccessControl, AccessOptions, PermissionRegistry};
use gatehouse_core::AccessError;
use gatehouse_infra::{Config, JsonFilePersistence};

/// Build the engine described by `config`, seeding built-in groups and, on
/// first run, the configured administrator.
pub fn build(config: &Config) -> Result<AccessControl> {
    let persistence = JsonFilePersistence::open(&config.data_dir)
        .with_context(|| format!("failed to open data directory {}", config.data_dir.display()))?;

    let access = AccessControl::new(
        Arc::new(PermissionRegistry::with_builtin()),
        Arc::new(persistence),
        AccessOptions {
            freshness_window: config.freshness_window(),
            enabled: config.access_control,
            ..Default::default()
        },
    )
    .context("failed to load access-control state")?;

    bootstrap(&access, config)?;
    Ok(access)
}

/// Create the configured first administrator if setup is still pending.
///
/// Returns whether an administrator was created.
pub fn bootstrap(access: &AccessControl, config: &Config) -> Result<bool> {
    if !access.needs_setup() {
        return Ok(false);
    }
    let Some(admin) = &config.admin else {
        tracing::warn!("no users yet and no GATEHOUSE_ADMIN_USER configured; setup required");
        return Ok(false);
    };

    match access.bootstrap_admin(&admin.username, &admin.password) {
        Ok(_) => Ok(true),
        // Another process completed setup first.
        Err(AccessError::Forbidden(_)) => Ok(false),
        Err(err) => Err(err).context("failed to create initial administrator"),
    }
}

/// Startup summary, logged and printed by the binary.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub access_control: bool,
    pub setup_required: bool,
    pub users: usize,
    pub groups: usize,
    pub permissions: usize,
    pub freshness_window_secs: i64,
}

pub fn status(access: &AccessControl) -> Status {
    Status {
        access_control: access.users().is_enabled(),
        setup_required: access.needs_setup(),
        users: access.users().get_all_users().len(),
        groups: access.groups().list_groups().len(),
        permissions: access.permissions().len(),
        freshness_window_secs: access.gate().window().num_seconds(),
    }
}
