//! Typed key-value bags for `settings`, `globals` and `parserOptions`
//!
//! Leaves are restricted to strings, numbers, booleans, lists and nested
//! maps. `null` is rejected at parse time.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Ordered string-keyed bag of setting values
pub type SettingsMap = IndexMap<String, SettingValue>;

/// A single setting value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<SettingValue>),
    Map(SettingsMap),
}

/// The kind of a setting value, used by option schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Number,
    String,
    List,
    Map,
}

impl SettingValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            SettingValue::Bool(_) => ValueKind::Bool,
            SettingValue::Number(_) => ValueKind::Number,
            SettingValue::String(_) => ValueKind::String,
            SettingValue::List(_) => ValueKind::List,
            SettingValue::Map(_) => ValueKind::Map,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&SettingsMap> {
        match self {
            SettingValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Deep merge `overlay` onto `self`
    ///
    /// Maps merge by key (recursively); lists and scalars are replaced.
    pub fn deep_merge(self, overlay: SettingValue) -> SettingValue {
        match (self, overlay) {
            (SettingValue::Map(mut base), SettingValue::Map(overlay)) => {
                for (key, value) in overlay {
                    let merged = match base.shift_remove(&key) {
                        Some(existing) => existing.deep_merge(value),
                        None => value,
                    };
                    base.insert(key, merged);
                }
                SettingValue::Map(base)
            }
            (_, overlay) => overlay,
        }
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::String(value)
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Number(value.into())
    }
}

/// Overlay `overlay` onto `base`, key by key
///
/// Keys listed in `deep_keys` deep-merge; every other key is replaced
/// wholesale.
pub fn overlay_settings<'a, I>(base: &mut SettingsMap, overlay: &SettingsMap, deep_keys: I)
where
    I: IntoIterator<Item = &'a String> + Clone,
{
    for (key, value) in overlay {
        let deep = deep_keys.clone().into_iter().any(|k| k == key);
        match base.get_mut(key) {
            Some(existing) if deep => {
                let current = std::mem::replace(existing, SettingValue::Bool(false));
                *existing = current.deep_merge(value.clone());
            }
            Some(existing) => *existing = value.clone(),
            None => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}
