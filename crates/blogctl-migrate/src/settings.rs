use std::fs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::InstanceLayout;

pub const DEFAULT_SERVICE_USER: &str = "ghost";
pub const DEFAULT_MIGRATOR: &str = "knex-migrator-migrate";
pub const DEFAULT_SUDO_PROGRAM: &str = "sudo";

/// Tool-side knobs for the migration step, read from `.blogctl.toml` in the
/// instance root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationSettings {
    /// System account that owns the content directory on managed hosts.
    pub service_user: String,
    pub migrator: String,
    pub sudo_program: String,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            service_user: DEFAULT_SERVICE_USER.to_string(),
            migrator: DEFAULT_MIGRATOR.to_string(),
            sudo_program: DEFAULT_SUDO_PROGRAM.to_string(),
        }
    }
}

impl MigrationSettings {
    pub fn load(layout: &InstanceLayout) -> Result<Self> {
        let path = layout.settings_path();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed reading settings: {}", path.display()))?;
        parse_settings(&content)
            .with_context(|| format!("failed parsing settings: {}", path.display()))
    }
}

pub(crate) fn parse_settings(raw: &str) -> Result<MigrationSettings> {
    let settings: MigrationSettings = toml::from_str(raw)?;
    if settings.service_user.trim().is_empty() {
        anyhow::bail!("service_user must not be empty");
    }
    if settings.migrator.trim().is_empty() {
        anyhow::bail!("migrator must not be empty");
    }
    Ok(settings)
}
