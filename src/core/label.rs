//! Logger-level labels
//!
//! Labels are fixed key/value pairs attached to every entry a logger emits
//! (service name, version, environment). They are rendered once when the
//! logger is built and shared by reference afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub key: String,
    pub value: String,
}

impl Label {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Pre-rendered set of labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Labels {
    labels: Vec<Label>,
    text: String,
    json: serde_json::Map<String, serde_json::Value>,
}

impl Labels {
    pub fn new(labels: Vec<Label>) -> Self {
        let text = labels
            .iter()
            .map(|label| format!("{}={}", label.key, label.value))
            .collect::<Vec<_>>()
            .join(" ");
        let json = labels
            .iter()
            .map(|label| (label.key.clone(), serde_json::Value::String(label.value.clone())))
            .collect();

        Self { labels, text, json }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|label| label.key == key)
            .map(|label| label.value.as_str())
    }

    /// `key=value` pairs separated by spaces
    pub fn as_text(&self) -> &str {
        &self.text
    }

    pub fn as_json(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.json
    }

    pub fn to_vec(&self) -> Vec<Label> {
        self.labels.clone()
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromIterator<Label> for Labels {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
