use blogctl_config::{apply_default_if_absent, ConfigOverrideScope, ConfigStore};
use serde_json::{json, Value};

use crate::{
    classify, ClassificationInput, ExecutionContextSelector, HostProbe, InstanceLayout,
    MigrationError, MigrationExecutor, MigrationInvoker, MigrationSettings, ProcessOutcome,
    StorageEngine,
};

pub const CONTENT_PATH_KEY: &str = "paths.contentPath";
pub const LOGGING_TRANSPORTS_KEY: &str = "logging.transports";

/// Inputs of one migration attempt. Built by the caller and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationContext {
    pub layout: InstanceLayout,
    pub environment: String,
    /// Top-level command that triggered the migration, e.g. `update`.
    pub invoking_command: String,
    pub settings: MigrationSettings,
}

impl MigrationContext {
    pub fn new(
        layout: InstanceLayout,
        environment: impl Into<String>,
        invoking_command: impl Into<String>,
        settings: MigrationSettings,
    ) -> Self {
        Self {
            layout,
            environment: environment.into(),
            invoking_command: invoking_command.into(),
            settings,
        }
    }
}

fn forced_logging_transports() -> Value {
    json!(["file"])
}

/// Runs the external migrator once against the current release.
///
/// The logging transports are forced to the file transport while the
/// migrator runs and written back afterwards, whatever the outcome. A failed
/// write-back is reported instead of the migrator's own error.
pub fn run_migrations<S, E, P>(
    context: &MigrationContext,
    config: &mut S,
    executor: &mut E,
    probe: &P,
) -> Result<(), MigrationError>
where
    S: ConfigStore,
    E: MigrationExecutor,
    P: HostProbe,
{
    let layout = &context.layout;
    tracing::info!(
        root = %layout.root().display(),
        environment = %context.environment,
        command = %context.invoking_command,
        "running database migrations"
    );

    let content_default = Value::String(layout.content_dir().display().to_string());
    apply_default_if_absent(config, CONTENT_PATH_KEY, content_default)
        .map_err(MigrationError::Config)?;
    let engine = StorageEngine::from_config(config);

    let transports = forced_logging_transports();
    let scope = ConfigOverrideScope::open(config, LOGGING_TRANSPORTS_KEY, transports)
        .map_err(MigrationError::Config)?;

    let selector = ExecutionContextSelector::new(&context.settings.service_user);
    let mode = selector.select_mode(engine, &layout.content_dir(), probe);
    let outcome = MigrationInvoker::new(&context.settings).run(mode, layout, executor);

    let classified = match &outcome {
        ProcessOutcome::Success => None,
        ProcessOutcome::Failure(failure) => Some(classify(
            failure,
            &ClassificationInput {
                config: scope.store(),
                environment: &context.environment,
                invoking_command: &context.invoking_command,
            },
        )),
    };

    if let Err(source) = scope.close() {
        if let Some(masked) = &classified {
            tracing::warn!(
                kind = masked.kind().as_str(),
                "migration error masked by config restore failure: {masked}"
            );
        }
        return Err(MigrationError::Restore {
            key: LOGGING_TRANSPORTS_KEY.to_string(),
            source,
        });
    }

    match classified {
        Some(err) => {
            tracing::info!(kind = err.kind().as_str(), "database migration failed");
            Err(err.into())
        }
        None => {
            tracing::info!(mode = mode.as_str(), "database migrations complete");
            Ok(())
        }
    }
}
