mod scope;
mod store;

pub use scope::{apply_default_if_absent, ConfigOverrideScope};
pub use store::{ConfigStore, JsonConfigStore};
