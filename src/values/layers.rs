//! Default layering: builtin defaults < provider defaults < user overrides.
//!
//! Layers are kept as YAML trees so "explicitly set" has a precise meaning:
//! a key present (and non-null) in the higher layer. Merging is key-wise and
//! recursive; scalars and sequences from the higher layer replace.
use super::{CloudProvider, Configuration, DEFAULT_AWS_REGION, DEFAULT_GCP_REGION};
use serde_yaml::{Mapping, Value};
use std::fmt;

/// Where the effective value of a field comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Provenance {
    Default,
    ProviderDefault,
    UserOverride,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Default => "default",
            Provenance::ProviderDefault => "provider-default",
            Provenance::UserOverride => "user-override",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Merge `overrides` onto `base`; keys set in `overrides` win.
///
/// Null values in `overrides` count as unset and inherit from `base`.
pub fn merge_documents(base: &Value, overrides: &Value) -> Value {
    match (base, overrides) {
        (_, Value::Null) => base.clone(),
        (Value::Mapping(base_map), Value::Mapping(override_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in override_map {
                let next = match base_map.get(key) {
                    Some(existing) => merge_documents(existing, value),
                    None => strip_nulls(value),
                };
                merged.insert(key.clone(), next);
            }
            Value::Mapping(merged)
        }
        _ => overrides.clone(),
    }
}

fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Provider-specific defaults layered between builtin defaults and the user.
pub fn provider_defaults(provider: CloudProvider) -> Value {
    let mut layer = Value::Mapping(Mapping::new());
    match provider {
        CloudProvider::Aws => {
            set_path(&mut layer, "cloud.region", DEFAULT_AWS_REGION.into());
            set_path(
                &mut layer,
                "clickhouse.s3.useEnvironmentCredentials",
                true.into(),
            );
        }
        CloudProvider::Gcp => {
            set_path(&mut layer, "cloud.region", DEFAULT_GCP_REGION.into());
            // ClickHouse reaches GCS through HMAC keys; workload identity is not supported.
            set_path(
                &mut layer,
                "clickhouse.s3.useEnvironmentCredentials",
                false.into(),
            );
        }
        CloudProvider::None => {}
    }
    layer
}

/// Look up a dotted path in a YAML tree.
pub(crate) fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(root, |node, segment| node.as_mapping()?.get(segment))
}

/// Set a dotted path in a YAML tree, creating intermediate mappings.
pub(crate) fn set_path(root: &mut Value, path: &str, value: Value) {
    let mut node = root;
    for segment in path.split('.') {
        if !node.is_mapping() {
            *node = Value::Mapping(Mapping::new());
        }
        let Value::Mapping(map) = node else {
            return;
        };
        node = map
            .entry(Value::String(segment.to_string()))
            .or_insert(Value::Null);
    }
    *node = value;
}

/// A configuration assembled from its three layers.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    builtin: Value,
    user: Value,
}

impl Default for LayeredConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LayeredConfig {
    /// Start from builtin defaults with no user overrides.
    pub fn new() -> Self {
        Self::from_user_document(Value::Mapping(Mapping::new()))
    }

    /// Treat a loaded document as the user layer.
    pub fn from_user_document(user: Value) -> Self {
        let builtin = serde_yaml::to_value(Configuration::default())
            .unwrap_or_else(|_| Value::Mapping(Mapping::new()));
        let user = if user.is_mapping() {
            user
        } else {
            Value::Mapping(Mapping::new())
        };
        Self { builtin, user }
    }

    /// Provider selected by the builtin and user layers.
    pub fn provider(&self) -> CloudProvider {
        let raw = get_path(&self.user, "cloudProvider")
            .or_else(|| get_path(&self.builtin, "cloudProvider"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        CloudProvider::parse(raw).unwrap_or(CloudProvider::None)
    }

    /// Builtin defaults with provider defaults applied.
    pub fn defaults(&self) -> Value {
        merge_documents(&self.builtin, &provider_defaults(self.provider()))
    }

    pub fn effective_value(&self) -> Value {
        merge_documents(&self.defaults(), &self.user)
    }

    pub fn effective(&self) -> Result<Configuration, serde_yaml::Error> {
        let defaults: Configuration = serde_yaml::from_value(self.defaults())?;
        Configuration::merge(&defaults, &self.user)
    }

    /// Current effective value at a dotted path.
    pub fn get(&self, path: &str) -> Option<Value> {
        get_path(&self.effective_value(), path).cloned()
    }

    /// Effective string value at a dotted path, empty when unset.
    pub fn get_str(&self, path: &str) -> String {
        match self.get(path) {
            Some(Value::String(text)) => text,
            Some(Value::Number(number)) => number.to_string(),
            Some(Value::Bool(flag)) => flag.to_string(),
            _ => String::new(),
        }
    }

    pub fn get_bool(&self, path: &str) -> bool {
        self.get(path).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Record a user answer at a dotted path.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        set_path(&mut self.user, path, value.into());
    }

    /// Drop a user override so the field falls back to the lower layers.
    pub fn unset(&mut self, path: &str) {
        let (parent, leaf) = match path.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, path),
        };
        let node = match parent {
            Some(parent) => get_path_mut(&mut self.user, parent),
            None => Some(&mut self.user),
        };
        if let Some(Value::Mapping(map)) = node {
            map.remove(leaf);
        }
    }

    /// Whether the user layer holds a value at `path`.
    pub fn is_set(&self, path: &str) -> bool {
        get_path(&self.user, path).is_some_and(|value| !value.is_null())
    }

    /// Layer that supplies the effective value of a field.
    pub fn provenance(&self, path: &str) -> Provenance {
        let builtin = get_path(&self.builtin, path);
        let defaults = self.defaults();
        let provider_value = get_path(&defaults, path);
        let user_value = get_path(&self.user, path).filter(|v| !v.is_null());
        match user_value {
            Some(value) if Some(value) != provider_value => Provenance::UserOverride,
            _ if provider_value != builtin => Provenance::ProviderDefault,
            _ => Provenance::Default,
        }
    }
}

fn get_path_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.')
        .try_fold(root, |node, segment| node.as_mapping_mut()?.get_mut(segment))
}

impl Configuration {
    /// Field-wise override: keys present in `overrides` replace those of `base`.
    pub fn merge(
        base: &Configuration,
        overrides: &Value,
    ) -> Result<Configuration, serde_yaml::Error> {
        let base_value = serde_yaml::to_value(base)?;
        serde_yaml::from_value(merge_documents(&base_value, overrides))
    }
}

#[cfg(test)]
#[path = "layers_tests.rs"]
mod tests;
