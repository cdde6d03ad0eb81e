//! Configuration
//!
//! Loads configuration from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_FRESHNESS_WINDOW_SECS: i64 = 300;

/// Initial administrator created on first run.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
}

impl core::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `groups.json` and `users.json` (default: `./data`)
    pub data_dir: PathBuf,

    /// Credential-freshness window in seconds (default: 300)
    pub freshness_window_secs: i64,

    /// `false` disables the user store entirely (default: true)
    pub access_control: bool,

    /// First-run administrator (optional; both user and password must be set)
    pub admin: Option<AdminBootstrap>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let freshness_window_secs = match lookup("GATEHOUSE_FRESHNESS_WINDOW_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("GATEHOUSE_FRESHNESS_WINDOW_SECS is not an integer: {raw:?}"))?,
            None => DEFAULT_FRESHNESS_WINDOW_SECS,
        };
        if freshness_window_secs < 0 {
            bail!("GATEHOUSE_FRESHNESS_WINDOW_SECS must not be negative");
        }

        let access_control = lookup("GATEHOUSE_ACCESS_CONTROL")
            .map(|raw| is_truthy(&raw))
            .unwrap_or(true);

        let admin = match lookup("GATEHOUSE_ADMIN_USER").filter(|u| !u.trim().is_empty()) {
            Some(username) => Some(AdminBootstrap {
                username: username.trim().to_string(),
                password: lookup("GATEHOUSE_ADMIN_PASSWORD")
                    .filter(|p| !p.is_empty())
                    .context("GATEHOUSE_ADMIN_PASSWORD must be set when GATEHOUSE_ADMIN_USER is")?,
            }),
            None => None,
        };

        Ok(Self {
            data_dir: lookup("GATEHOUSE_DATA_DIR")
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            freshness_window_secs,
            access_control,
            admin,
        })
    }

    pub fn freshness_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.freshness_window_secs)
    }

    /// Create a default configuration for testing.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            freshness_window_secs: DEFAULT_FRESHNESS_WINDOW_SECS,
            access_control: true,
            admin: None,
        }
    }
}

/// `true`, `yes`, `y`, `1` and `on`, case-insensitively.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "on"
    )
}
