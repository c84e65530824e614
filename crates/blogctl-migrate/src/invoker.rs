use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::{ExecutionMode, InstanceLayout, MigrationSettings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Success,
    Failure(ProcessFailure),
}

/// Output captured from a failed migrator run. Either stream may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessFailure {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process never started or was killed by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessOutcome {
    pub fn from_output(output: &Output) -> Self {
        if output.status.success() {
            return Self::Success;
        }
        Self::Failure(ProcessFailure {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }

    pub fn launch_failure(program: &str, err: &std::io::Error) -> Self {
        Self::Failure(ProcessFailure {
            stdout: String::new(),
            stderr: format!("failed launching {program}: {err}"),
            exit_code: None,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Runs the migrator process. Both calls block until the process exits.
pub trait MigrationExecutor {
    /// Runs `program` from `local_bin_dir`, falling back to `PATH`.
    fn run_local(&mut self, program: &str, args: &[String], local_bin_dir: &Path) -> ProcessOutcome;

    /// Runs `command` through the privileged transport.
    fn sudo(&mut self, command: &str, sudo_args: &[String]) -> ProcessOutcome;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemExecutor {
    sudo_program: String,
}

impl SystemExecutor {
    pub fn new(sudo_program: impl Into<String>) -> Self {
        Self {
            sudo_program: sudo_program.into(),
        }
    }
}

impl MigrationExecutor for SystemExecutor {
    fn run_local(
        &mut self,
        program: &str,
        args: &[String],
        local_bin_dir: &Path,
    ) -> ProcessOutcome {
        let local_program = local_bin_dir.join(program);
        let resolved = if local_program.is_file() {
            local_program.into_os_string()
        } else {
            OsString::from(program)
        };

        let mut command = Command::new(&resolved);
        command.args(args);
        if let Some(path) = prepend_search_path(local_bin_dir) {
            command.env("PATH", path);
        }

        tracing::debug!(program = ?resolved, ?args, "running migrator");
        match command.output() {
            Ok(output) => ProcessOutcome::from_output(&output),
            Err(err) => ProcessOutcome::launch_failure(program, &err),
        }
    }

    fn sudo(&mut self, command: &str, sudo_args: &[String]) -> ProcessOutcome {
        let mut sudo = Command::new(&self.sudo_program);
        sudo.args(sudo_args).arg("sh").arg("-c").arg(command);

        tracing::debug!(
            sudo = %self.sudo_program,
            ?sudo_args,
            command,
            "running migrator elevated"
        );
        match sudo.output() {
            Ok(output) => ProcessOutcome::from_output(&output),
            Err(err) => ProcessOutcome::launch_failure(&self.sudo_program, &err),
        }
    }
}

fn prepend_search_path(dir: &Path) -> Option<OsString> {
    let mut paths = vec![dir.to_path_buf()];
    if let Some(existing) = std::env::var_os("PATH") {
        paths.extend(std::env::split_paths(&existing));
    }
    std::env::join_paths(paths).ok()
}

/// Arguments every migrator run receives.
pub fn migrator_args(current_dir: &Path) -> Vec<String> {
    vec!["--init".to_string(), "--mgpath".to_string(), current_dir.display().to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationInvoker {
    migrator: String,
    service_user: String,
}

impl MigrationInvoker {
    pub fn new(settings: &MigrationSettings) -> Self {
        Self {
            migrator: settings.migrator.clone(),
            service_user: settings.service_user.clone(),
        }
    }

    pub fn sudo_args(&self) -> Vec<String> {
        vec!["-E".to_string(), "-u".to_string(), self.service_user.clone()]
    }

    /// The single shell command handed to the privileged transport.
    pub fn elevated_command(&self, layout: &InstanceLayout) -> String {
        let migrator_path = absolute_path(&layout.migrator_path(&self.migrator));
        let current_dir = absolute_path(&layout.current_dir());
        std::iter::once(migrator_path.display().to_string())
            .chain(migrator_args(&current_dir))
            .map(|part| shell_quote(&part))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn run<E: MigrationExecutor>(
        &self,
        mode: ExecutionMode,
        layout: &InstanceLayout,
        executor: &mut E,
    ) -> ProcessOutcome {
        let outcome = match mode {
            ExecutionMode::Direct => executor.run_local(
                &self.migrator,
                &migrator_args(&layout.current_dir()),
                &layout.local_bin_dir(),
            ),
            ExecutionMode::Elevated => {
                executor.sudo(&self.elevated_command(layout), &self.sudo_args())
            }
        };

        if let ProcessOutcome::Failure(failure) = &outcome {
            tracing::debug!(
                mode = mode.as_str(),
                exit_code = ?failure.exit_code,
                stderr_bytes = failure.stderr.len(),
                stdout_bytes = failure.stdout.len(),
                "migrator failed"
            );
        }
        outcome
    }
}

fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

pub(crate) fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "-_./=:@+,".contains(ch));
    if safe {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
