use thiserror::Error;

use crate::{ClassifiedError, ErrorKind};

pub const EXIT_CONFIG_ERROR: i32 = 2;
pub const EXIT_SYSTEM_ERROR: i32 = 3;
pub const EXIT_PROCESS_ERROR: i32 = 4;
pub const EXIT_CONFIG_STORE_FAILURE: i32 = 5;

/// Why a migration attempt did not complete.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The migrator ran and failed.
    #[error(transparent)]
    Classified(#[from] ClassifiedError),

    /// Writing the overridden key back failed; the config store is unhealthy.
    #[error("failed restoring config key '{key}': {source:#}")]
    Restore {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Reading or writing the config store failed before the migrator ran.
    #[error("config store error: {0:#}")]
    Config(#[source] anyhow::Error),
}

impl MigrationError {
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Classified(err) => Some(err),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Classified(err) => match err.kind() {
                ErrorKind::Config => EXIT_CONFIG_ERROR,
                ErrorKind::System => EXIT_SYSTEM_ERROR,
                ErrorKind::Process => EXIT_PROCESS_ERROR,
            },
            Self::Restore { .. } | Self::Config(_) => EXIT_CONFIG_STORE_FAILURE,
        }
    }
}
