//! Key-value container whose entries can be switched off without deletion
//!
//! Backs every user-editable header, cookie and form-field table. Only
//! enabled entries are ever sent or compared.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One `key: value` entry with its enable flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Element {
    pub key: String,
    pub value: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

const fn enabled_by_default() -> bool {
    true
}

impl Element {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>, enabled: bool) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled,
        }
    }

    #[must_use]
    pub fn enabled(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, value, true)
    }
}

/// Ordered `(key, value, enabled)` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct PartialDictionary {
    pub elements: Vec<Element>,
}

impl PartialDictionary {
    #[must_use]
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    /// Mapping of enabled entries. A later duplicate key overwrites an earlier one.
    #[must_use]
    pub fn get(&self) -> BTreeMap<String, String> {
        self.elements
            .iter()
            .filter(|e| e.enabled)
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.elements.iter().any(|e| e.enabled)
    }

    /// Build an all-enabled container from `(key, value)` pairs.
    pub fn from_mapping<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            elements: pairs
                .into_iter()
                .map(|(k, v)| Element::enabled(k, v))
                .collect(),
        }
    }

    /// Parse `key: value` lines. Lines without a `:` are skipped.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let elements = text
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| Element::enabled(k.trim(), v.trim()))
            .collect();
        Self { elements }
    }

    /// Parse a JSON object. Anything that is not an object yields an empty container.
    #[must_use]
    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(serde_json::Value::Object(map)) => Self::from_mapping(map.into_iter().map(
                |(k, v)| match v {
                    serde_json::Value::String(s) => (k, s),
                    other => (k, other.to_string()),
                },
            )),
            _ => Self::default(),
        }
    }

    /// Pretty JSON object of the enabled entries.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.get()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Enabled entries of `a` overlaid with enabled entries of `b`.
    #[must_use]
    pub fn merge(a: &Self, b: &Self) -> Self {
        let mut merged = a.get();
        merged.extend(b.get());
        Self::from_mapping(merged)
    }

    /// Set `key` to `value`, enabling it. Appends when the key is new.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.elements.iter_mut().rev().find(|e| e.key == key) {
            Some(existing) => {
                existing.value = value;
                existing.enabled = true;
            }
            None => self.elements.push(Element::enabled(key, value)),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PartialDictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_mapping(iter)
    }
}
