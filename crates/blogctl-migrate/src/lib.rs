mod classify;
mod error;
mod execution;
mod invoker;
mod layout;
mod migrate;
mod settings;

pub use classify::{
    classify, ClassificationInput, ClassifiedError, ConfigEntry, ErrorKind, DATABASE_HOST_KEY,
    DATABASE_PASSWORD_KEY, DATABASE_USER_KEY, GENERAL_MIGRATION_HELP, ROLLBACK_SUGGESTION,
    SQLITE_INSTALL_HELP,
};
pub use error::{
    MigrationError, EXIT_CONFIG_ERROR, EXIT_CONFIG_STORE_FAILURE, EXIT_PROCESS_ERROR,
    EXIT_SYSTEM_ERROR,
};
pub use execution::{
    select_execution_mode, ExecutionContextSelector, ExecutionMode, HostProbe, Identity,
    OwnershipFacts, StorageEngine, SystemProbe, DATABASE_CLIENT_KEY,
};
pub use invoker::{
    migrator_args, MigrationExecutor, MigrationInvoker, ProcessFailure, ProcessOutcome,
    SystemExecutor,
};
pub use layout::InstanceLayout;
pub use migrate::{run_migrations, MigrationContext, CONTENT_PATH_KEY, LOGGING_TRANSPORTS_KEY};
pub use settings::{
    MigrationSettings, DEFAULT_MIGRATOR, DEFAULT_SERVICE_USER, DEFAULT_SUDO_PROGRAM,
};
