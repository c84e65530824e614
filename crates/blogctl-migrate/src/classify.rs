use blogctl_config::ConfigStore;
use serde_json::Value;
use thiserror::Error;

use crate::ProcessFailure;

pub const DATABASE_HOST_KEY: &str = "database.connection.host";
pub const DATABASE_USER_KEY: &str = "database.connection.user";
pub const DATABASE_PASSWORD_KEY: &str = "database.connection.password";

const HOST_NOT_FOUND_SIGNATURE: &str = "CODE: ENOTFOUND";
const ACCESS_DENIED_SIGNATURE: &str = "CODE: ER_ACCESS_DENIED_ERROR";
// The sqlite driver prints its reinstall hint on stdout, not stderr.
const SQLITE_REINSTALL_SIGNATURE: &str = "npm install sqlite3 --save";

const SQLITE_INSTALL_MESSAGE: &str = "It appears that sqlite3 did not install properly when \
Ghost-CLI was installed.\nPlease either uninstall and reinstall Ghost-CLI, or switch to MySQL";

pub const SQLITE_INSTALL_HELP: &str =
    "https://docs.ghost.org/v1/docs/troubleshooting#section-sqlite3-install-failure";
pub const GENERAL_MIGRATION_HELP: &str =
    "https://docs.ghost.org/v1/docs/troubleshooting#section-general-update-error";
pub const ROLLBACK_SUGGESTION: &str = "ghost update --rollback";
const UPDATE_COMMAND: &str = "update";

/// One offending configuration key and the value it currently holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    System,
    Process,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "ConfigError",
            Self::System => "SystemError",
            Self::Process => "ProcessError",
        }
    }
}

/// A migrator failure translated into something the user can act on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifiedError {
    /// A persisted configuration value is the root cause.
    #[error("{message}")]
    Config {
        message: String,
        entries: Vec<ConfigEntry>,
        environment: String,
    },
    /// The local database driver installation is broken.
    #[error("{message}")]
    System {
        message: String,
        help: String,
        environment: String,
    },
    /// Anything the migrator printed that we do not recognise.
    #[error("{message}")]
    Process {
        message: String,
        stderr: String,
        exit_code: Option<i32>,
        help: String,
        suggestion: Option<String>,
        environment: String,
    },
}

impl ClassifiedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Config,
            Self::System { .. } => ErrorKind::System,
            Self::Process { .. } => ErrorKind::Process,
        }
    }

    pub fn environment(&self) -> &str {
        match self {
            Self::Config { environment, .. }
            | Self::System { environment, .. }
            | Self::Process { environment, .. } => environment,
        }
    }

    pub fn help(&self) -> Option<&str> {
        match self {
            Self::Config { .. } => None,
            Self::System { help, .. } | Self::Process { help, .. } => Some(help),
        }
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Process { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }

    /// Multi-line report for terminal display, without styling.
    pub fn report_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match self {
            Self::Config {
                message,
                entries,
                environment,
            } => {
                lines.push(format!("Error detected in the {environment} configuration."));
                lines.push(format!("Message: {message}"));
                for entry in entries {
                    lines.push(format!("Configuration key: {}", entry.key));
                    lines.push(format!(
                        "Current value: {}",
                        render_config_value(entry.value.as_ref())
                    ));
                }
                if let Some(entry) = entries.first() {
                    lines.push(format!(
                        "Run `blogctl config {} <new value>` to fix it.",
                        entry.key
                    ));
                }
            }
            Self::System { message, help, .. } => {
                lines.push(format!("A system error occurred: {message}"));
                lines.push(format!("Help: {help}"));
            }
            Self::Process {
                message,
                stderr,
                exit_code,
                help,
                suggestion,
                ..
            } => {
                lines.push(format!("A process error occurred: {message}"));
                if let Some(code) = exit_code {
                    lines.push(format!("Exit code: {code}"));
                }
                let stderr = stderr.trim();
                if !stderr.is_empty() {
                    lines.push("--------------- stderr ---------------".to_string());
                    lines.extend(stderr.lines().map(str::to_string));
                }
                if let Some(suggestion) = suggestion {
                    lines.push(format!("Suggestion: {suggestion}"));
                }
                lines.push(format!("Help: {help}"));
            }
        }
        lines
    }
}

fn render_config_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "(not set)".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// What the classifier needs besides the raw output.
pub struct ClassificationInput<'a, S: ConfigStore> {
    pub config: &'a S,
    pub environment: &'a str,
    pub invoking_command: &'a str,
}

/// Maps raw migrator output to exactly one error. Rules are checked in order
/// and the first match wins; unrecognised output becomes a process error.
pub fn classify<S: ConfigStore>(
    failure: &ProcessFailure,
    input: &ClassificationInput<'_, S>,
) -> ClassifiedError {
    let environment = input.environment.to_string();

    if failure.stderr.contains(HOST_NOT_FOUND_SIGNATURE) {
        return ClassifiedError::Config {
            message: "Invalid database host".to_string(),
            entries: config_entries(input.config, &[DATABASE_HOST_KEY]),
            environment,
        };
    }

    if failure.stderr.contains(ACCESS_DENIED_SIGNATURE) {
        return ClassifiedError::Config {
            message: "Invalid database username or password".to_string(),
            entries: config_entries(input.config, &[DATABASE_USER_KEY, DATABASE_PASSWORD_KEY]),
            environment,
        };
    }

    if failure.stdout.contains(SQLITE_REINSTALL_SIGNATURE) {
        return ClassifiedError::System {
            message: SQLITE_INSTALL_MESSAGE.to_string(),
            help: SQLITE_INSTALL_HELP.to_string(),
            environment,
        };
    }

    let suggestion =
        (input.invoking_command == UPDATE_COMMAND).then(|| ROLLBACK_SUGGESTION.to_string());
    ClassifiedError::Process {
        message: "The database migration in Ghost encountered an error.".to_string(),
        stderr: failure.stderr.clone(),
        exit_code: failure.exit_code,
        help: GENERAL_MIGRATION_HELP.to_string(),
        suggestion,
        environment,
    }
}

fn config_entries<S: ConfigStore>(config: &S, keys: &[&str]) -> Vec<ConfigEntry> {
    keys.iter()
        .map(|key| ConfigEntry {
            key: key.to_string(),
            value: config.get(key),
        })
        .collect()
}
