use anyhow::{Context, Result};
use serde_json::Value;

use crate::ConfigStore;

/// Persists `value` under `key` only when the key is not configured yet.
///
/// Returns whether a write happened. This is a permanent fill-in; nothing
/// restores it.
pub fn apply_default_if_absent<S: ConfigStore>(
    store: &mut S,
    key: &str,
    value: Value,
) -> Result<bool> {
    if store.has(key) {
        return Ok(false);
    }

    tracing::debug!(key, value = %value, "filling in missing config default");
    store
        .set(key, value)
        .save()
        .with_context(|| format!("failed saving default for config key '{key}'"))?;
    Ok(true)
}

/// Temporarily overrides one config key and writes the previous value back
/// when the scope ends.
///
/// `close` reports restore failures to the caller. A scope that is dropped
/// without being closed (early return, panic) still restores, logging any
/// failure. The previous value is written back at most once either way.
///
/// Restoring works on the shallowest segment of the key that the override
/// creates or replaces, so parents it had to create are removed again and a
/// non-object parent it had to replace comes back unchanged.
pub struct ConfigOverrideScope<'a, S: ConfigStore> {
    store: &'a mut S,
    key: String,
    previous: Option<Value>,
    restore_key: String,
    restore_value: Option<Value>,
    released: bool,
}

impl<'a, S: ConfigStore> ConfigOverrideScope<'a, S> {
    pub fn open(store: &'a mut S, key: &str, value: Value) -> Result<Self> {
        let previous = store.get(key);
        let restore_key = restore_anchor(&*store, key);
        let restore_value = store.get(&restore_key);
        tracing::debug!(
            key,
            previous = ?previous,
            restore_key = %restore_key,
            value = %value,
            "overriding config key"
        );

        // The override is written even when it matches the stored value.
        if let Err(err) = store.set(key, value).save() {
            restore_in_memory(store, &restore_key, restore_value.as_ref());
            return Err(err).with_context(|| format!("failed overriding config key '{key}'"));
        }

        Ok(Self {
            store,
            key: key.to_string(),
            previous,
            restore_key,
            restore_value,
            released: false,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Value observed when the scope opened; `None` means the key was unset.
    pub fn previous(&self) -> Option<&Value> {
        self.previous.as_ref()
    }

    pub fn store(&self) -> &S {
        &*self.store
    }

    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        restore_in_memory(self.store, &self.restore_key, self.restore_value.as_ref());
        self.store
            .save()
            .with_context(|| format!("failed restoring config key '{}'", self.key))
    }
}

impl<S: ConfigStore> Drop for ConfigOverrideScope<'_, S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        tracing::warn!(key = %self.key, "config override scope dropped without close; restoring");
        if let Err(err) = self.release() {
            tracing::warn!(key = %self.key, "{err:#}");
        }
    }
}

fn restore_in_memory<S: ConfigStore>(store: &mut S, key: &str, previous: Option<&Value>) {
    match previous {
        Some(value) => {
            store.set(key, value.clone());
        }
        None => {
            store.unset(key);
        }
    }
}

/// Shallowest prefix of `key` that setting `key` would create or replace.
/// Falls back to `key` itself when every parent is already an object.
fn restore_anchor<S: ConfigStore>(store: &S, key: &str) -> String {
    for (end, _) in key.match_indices('.') {
        let prefix = &key[..end];
        match store.get(prefix) {
            Some(Value::Object(_)) => continue,
            _ => return prefix.to_string(),
        }
    }
    key.to_string()
}
