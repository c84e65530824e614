use std::path::PathBuf;

use anyhow::{Context, Result};
use blogctl_config::{ConfigStore, JsonConfigStore};
use blogctl_migrate::{
    run_migrations, InstanceLayout, MigrationContext, MigrationSettings, SystemExecutor,
    SystemProbe,
};
use serde_json::Value;

use crate::render::{print_status, resolve_output_style};
use crate::{Cli, Commands};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let layout = InstanceLayout::new(resolve_instance_root(cli.dir.clone())?);
    let command_name = cli.command.name();
    tracing::debug!(
        root = %layout.root().display(),
        environment = %cli.environment,
        command = command_name,
        "resolved instance"
    );

    match &cli.command {
        Commands::Migrate | Commands::Update => {
            let settings = resolve_settings(&cli, &layout)?;
            let mut config = JsonConfigStore::load(layout.config_path(&cli.environment))?;
            let context =
                MigrationContext::new(layout, cli.environment.clone(), command_name, settings);
            let mut executor = SystemExecutor::new(context.settings.sudo_program.clone());

            run_migrations(&context, &mut config, &mut executor, &SystemProbe)?;
            print_status(resolve_output_style(), "ok", "database migrations complete");
        }
        Commands::Config { key, value } => {
            let mut config = JsonConfigStore::load(layout.config_path(&cli.environment))?;
            match value {
                Some(raw) => {
                    config
                        .set(key, parse_config_value(raw))
                        .save()
                        .with_context(|| format!("failed saving config key '{key}'"))?;
                }
                None => {
                    if let Some(current) = config.get(key) {
                        println!("{}", render_config_value(&current));
                    }
                }
            }
        }
    }

    Ok(())
}

fn resolve_instance_root(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("failed resolving working directory"),
    }
}

/// Settings file values with command-line overrides applied on top.
pub(crate) fn resolve_settings(cli: &Cli, layout: &InstanceLayout) -> Result<MigrationSettings> {
    let mut settings = MigrationSettings::load(layout)?;
    if let Some(service_user) = &cli.service_user {
        settings.service_user = service_user.clone();
    }
    if let Some(migrator) = &cli.migrator {
        settings.migrator = migrator.clone();
    }
    Ok(settings)
}

/// JSON literals keep their type; anything else is stored as a string.
pub(crate) fn parse_config_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub(crate) fn render_config_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
