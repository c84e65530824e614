use std::path::{Path, PathBuf};

/// Paths of one installed blog instance, all derived from its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceLayout {
    root: PathBuf,
}

impl InstanceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root.join("content")
    }

    /// The active, fully installed release.
    pub fn current_dir(&self) -> PathBuf {
        self.root.join("current")
    }

    pub fn config_path(&self, environment: &str) -> PathBuf {
        self.root.join(format!("config.{environment}.json"))
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(".blogctl.toml")
    }

    pub fn local_bin_dir(&self) -> PathBuf {
        self.current_dir().join("node_modules").join(".bin")
    }

    pub fn migrator_path(&self, migrator: &str) -> PathBuf {
        self.local_bin_dir().join(migrator)
    }
}
