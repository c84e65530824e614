use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// Persisted key/value configuration addressed by dotted keys
/// (`database.connection.host`).
///
/// Mutations only touch the in-memory view; `save` persists it.
pub trait ConfigStore {
    fn has(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<Value>;

    fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    fn set(&mut self, key: &str, value: Value) -> &mut Self;

    fn unset(&mut self, key: &str) -> &mut Self;

    fn save(&self) -> Result<()>;
}

/// Instance configuration kept as a single JSON object on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonConfigStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonConfigStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                values: Map::new(),
            });
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let values = parse_config_document(&content)
            .with_context(|| format!("failed parsing config: {}", path.display()))?;
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonConfigStore {
    fn has(&self, key: &str) -> bool {
        lookup(&self.values, key).is_some()
    }

    fn get(&self, key: &str) -> Option<Value> {
        lookup(&self.values, key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> &mut Self {
        insert(&mut self.values, key, value);
        self
    }

    fn unset(&mut self, key: &str) -> &mut Self {
        remove(&mut self.values, key);
        self
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed creating config dir: {}", parent.display()))?;
        }

        let mut content = serde_json::to_string_pretty(&self.values)
            .with_context(|| format!("failed serializing config: {}", self.path.display()))?;
        content.push('\n');
        fs::write(&self.path, content)
            .with_context(|| format!("failed writing config: {}", self.path.display()))
    }
}

pub(crate) fn parse_config_document(raw: &str) -> Result<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(raw)? {
        Value::Object(values) => Ok(values),
        other => anyhow::bail!(
            "config document must be a JSON object, found {}",
            json_type_name(&other)
        ),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn lookup<'a>(values: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.');
    let mut current = values.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn insert(values: &mut Map<String, Value>, key: &str, value: Value) {
    let (parents, leaf) = match key.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, key),
    };

    let mut current = values;
    for segment in parents.into_iter().flat_map(|parents| parents.split('.')) {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            unreachable!("entry was just replaced with an object");
        };
        current = next;
    }
    current.insert(leaf.to_string(), value);
}

fn remove(values: &mut Map<String, Value>, key: &str) {
    let Some((parents, leaf)) = key.rsplit_once('.') else {
        values.remove(key);
        return;
    };

    let mut current = values;
    for segment in parents.split('.') {
        let Some(Value::Object(next)) = current.get_mut(segment) else {
            return;
        };
        current = next;
    }
    current.remove(leaf);
}
