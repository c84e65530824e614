use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use blogctl_config::ConfigStore;

pub const DATABASE_CLIENT_KEY: &str = "database.client";
const EMBEDDED_CLIENT: &str = "sqlite3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Run as the invoking user.
    Direct,
    /// Run through the privileged transport as the service account.
    Elevated,
}

impl ExecutionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Elevated => "elevated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageEngine {
    /// File-based database living inside the content directory.
    Embedded,
    Networked,
}

impl StorageEngine {
    pub fn from_client(client: Option<&str>) -> Self {
        match client {
            Some(EMBEDDED_CLIENT) => Self::Embedded,
            _ => Self::Networked,
        }
    }

    pub fn from_config<S: ConfigStore>(config: &S) -> Self {
        let client = config.get(DATABASE_CLIENT_KEY);
        Self::from_client(client.as_ref().and_then(|value| value.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
}

/// Host facts the mode decision is made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipFacts {
    pub linux: bool,
    pub service: Option<Identity>,
    pub current: Option<Identity>,
    pub content_owner: Option<Identity>,
}

/// Access to user and file ownership information of the host.
pub trait HostProbe {
    fn is_linux(&self) -> bool;

    fn current_identity(&self) -> Result<Identity>;

    /// `Ok(None)` when no account with that name exists.
    fn named_identity(&self, name: &str) -> Result<Option<Identity>>;

    fn directory_owner(&self, path: &Path) -> Result<Identity>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl HostProbe for SystemProbe {
    fn is_linux(&self) -> bool {
        cfg!(target_os = "linux")
    }

    fn current_identity(&self) -> Result<Identity> {
        let uid = run_id_query("-u", None)?.context("id -u reported no current user")?;
        let gid = run_id_query("-g", None)?.context("id -g reported no current group")?;
        Ok(Identity { uid, gid })
    }

    fn named_identity(&self, name: &str) -> Result<Option<Identity>> {
        let Some(uid) = run_id_query("-u", Some(name))? else {
            return Ok(None);
        };
        let Some(gid) = run_id_query("-g", Some(name))? else {
            return Ok(None);
        };
        Ok(Some(Identity { uid, gid }))
    }

    #[cfg(unix)]
    fn directory_owner(&self, path: &Path) -> Result<Identity> {
        use std::os::unix::fs::MetadataExt;

        let metadata = std::fs::symlink_metadata(path)
            .with_context(|| format!("failed reading ownership of {}", path.display()))?;
        Ok(Identity {
            uid: metadata.uid(),
            gid: metadata.gid(),
        })
    }

    #[cfg(not(unix))]
    fn directory_owner(&self, path: &Path) -> Result<Identity> {
        anyhow::bail!("directory ownership is not available on this platform: {}", path.display())
    }
}

fn run_id_query(flag: &str, user: Option<&str>) -> Result<Option<u32>> {
    let mut command = Command::new("id");
    command.arg(flag);
    if let Some(user) = user {
        command.arg(user);
    }

    let output = command
        .output()
        .with_context(|| format!("failed launching id {flag}"))?;
    if !output.status.success() {
        return Ok(None);
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let id = raw
        .trim()
        .parse::<u32>()
        .with_context(|| format!("id {flag} returned a non-numeric id: '{}'", raw.trim()))?;
    Ok(Some(id))
}

/// Elevated only for an embedded database whose content directory belongs to
/// the service account, and only when we are not already that account.
pub fn select_execution_mode(engine: StorageEngine, facts: &OwnershipFacts) -> ExecutionMode {
    if engine != StorageEngine::Embedded || !facts.linux {
        return ExecutionMode::Direct;
    }
    let (Some(service), Some(owner)) = (facts.service, facts.content_owner) else {
        return ExecutionMode::Direct;
    };
    if owner.uid != service.uid && owner.gid != service.gid {
        return ExecutionMode::Direct;
    }
    match facts.current {
        Some(current) if current.uid == service.uid => ExecutionMode::Direct,
        _ => ExecutionMode::Elevated,
    }
}

/// Decides how the migrator runs. Holds no state between invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContextSelector {
    service_user: String,
}

impl ExecutionContextSelector {
    pub fn new(service_user: impl Into<String>) -> Self {
        Self {
            service_user: service_user.into(),
        }
    }

    pub fn service_user(&self) -> &str {
        &self.service_user
    }

    pub fn select_mode<P: HostProbe>(
        &self,
        engine: StorageEngine,
        content_dir: &Path,
        probe: &P,
    ) -> ExecutionMode {
        let facts = self.gather_facts(engine, content_dir, probe);
        let mode = select_execution_mode(engine, &facts);
        tracing::debug!(
            engine = ?engine,
            facts = ?facts,
            mode = mode.as_str(),
            "selected migrator execution mode"
        );
        mode
    }

    fn gather_facts<P: HostProbe>(
        &self,
        engine: StorageEngine,
        content_dir: &Path,
        probe: &P,
    ) -> OwnershipFacts {
        let linux = probe.is_linux();
        if engine != StorageEngine::Embedded || !linux {
            return OwnershipFacts {
                linux,
                service: None,
                current: None,
                content_owner: None,
            };
        }

        OwnershipFacts {
            linux,
            service: probe
                .named_identity(&self.service_user)
                .unwrap_or_else(|err| {
                    tracing::debug!("service account lookup failed: {err:#}");
                    None
                }),
            current: probe
                .current_identity()
                .map_err(|err| tracing::debug!("current user lookup failed: {err:#}"))
                .ok(),
            content_owner: probe
                .directory_owner(content_dir)
                .map_err(|err| tracing::debug!("{err:#}"))
                .ok(),
        }
    }
}
